//! Configuration loading tests
//!
//! Environment-variable tests are serialized because the process
//! environment is shared between test threads.

use anyhow::Result;
use mediacore::{DecoderMode, PipelineConfig};
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn test_file_then_defaults() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    // Partial file: unlisted sections keep their defaults.
    write!(file, "[reorder]\nlookahead = 6\n")?;

    let config = PipelineConfig::load_from(file.path())?;
    assert_eq!(config.reorder.lookahead, 6);
    assert_eq!(config.decoder.mode, DecoderMode::Auto);
    assert_eq!(config.log_level, "info");
    Ok(())
}

#[test]
#[serial]
fn test_env_overrides_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "[decoder]\nmode = \"hardware\"\n")?;

    std::env::set_var("MEDIACORE_DECODER_MODE", "software");
    std::env::set_var("MEDIACORE_REORDER_LOOKAHEAD", "2");
    let config = PipelineConfig::load_from(file.path());
    std::env::remove_var("MEDIACORE_DECODER_MODE");
    std::env::remove_var("MEDIACORE_REORDER_LOOKAHEAD");

    let config = config?;
    assert_eq!(config.decoder.mode, DecoderMode::Software);
    assert_eq!(config.reorder.lookahead, 2);
    Ok(())
}

#[test]
#[serial]
fn test_invalid_env_value_is_an_error() {
    std::env::set_var("MEDIACORE_REORDER_LOOKAHEAD", "not-a-number");
    let result = PipelineConfig::load();
    std::env::remove_var("MEDIACORE_REORDER_LOOKAHEAD");

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_validation_catches_bad_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "[resampler]\noutput_rate = 100\n")?;

    assert!(PipelineConfig::load_from(file.path()).is_err());
    Ok(())
}
