//! Utility module for mediacore
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Common helper functions

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{DecoderConfig, PipelineConfig, ReorderConfig, ResamplerConfig};
pub use error::{MediaCoreError, Result};

/// Load the pipeline configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. User configuration file
/// 3. Environment variables
///
/// # Returns
///
/// Returns the loaded configuration or an error if loading fails
pub fn load_config() -> Result<PipelineConfig> {
    PipelineConfig::load()
}

/// Format a timestamp for display
///
/// # Arguments
///
/// * `time` - Timestamp to format
///
/// # Returns
///
/// Formatted string "HH:MM:SS" or "MM:SS" for times under an hour;
/// sentinel values render as "--:--"
pub fn format_timestamp(time: crate::time::MediaTime) -> String {
    if !time.is_valid() || time == crate::time::MediaTime::BEGIN || time == crate::time::MediaTime::END
    {
        return "--:--".to_string();
    }

    let total_secs = time.to_seconds().max(0.0) as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
