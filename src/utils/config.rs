//! Configuration management for mediacore
//!
//! This module handles loading and managing pipeline configuration
//! from config files and environment variables.

use crate::decode::DecoderMode;
use crate::utils::error::{MediaCoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Decoder configuration
    pub decoder: DecoderConfig,

    /// Resampler configuration
    pub resampler: ResamplerConfig,

    /// Reorder queue configuration
    pub reorder: ReorderConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Engine selection policy
    pub mode: DecoderMode,
}

/// Resampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerConfig {
    /// Target sample rate for audio tracks (0 = keep stream rate)
    pub output_rate: u32,
}

/// Reorder queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Frames buffered before any is released mid-stream. Too small
    /// risks out-of-order release; too large adds latency.
    pub lookahead: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            resampler: ResamplerConfig::default(),
            reorder: ReorderConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { mode: DecoderMode::Auto }
    }
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self { output_rate: 0 }
    }
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self { lookahead: crate::reorder::DEFAULT_LOOKAHEAD }
    }
}

impl PipelineConfig {
    /// Load configuration from the standard sources
    ///
    /// Applied in order, later sources overriding earlier:
    /// 1. Default values
    /// 2. User config file (~/.config/mediacore/config.toml on Linux)
    /// 3. Environment variables (MEDIACORE_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load from an explicit TOML file plus env overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge configuration from a TOML file
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MediaCoreError::Config(format!("Failed to read config file: {}", e))
        })?;

        let file_config: PipelineConfig = toml::from_str(&contents).map_err(|e| {
            MediaCoreError::Config(format!("Failed to parse config file: {}", e))
        })?;

        *self = file_config;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // Example: MEDIACORE_DECODER_MODE=software
        if let Ok(mode) = std::env::var("MEDIACORE_DECODER_MODE") {
            self.decoder.mode = match mode.to_lowercase().as_str() {
                "auto" => DecoderMode::Auto,
                "hardware" => DecoderMode::Hardware,
                "software" => DecoderMode::Software,
                _ => {
                    return Err(MediaCoreError::Config(
                        "Invalid MEDIACORE_DECODER_MODE".to_string(),
                    ))
                }
            };
        }

        if let Ok(rate) = std::env::var("MEDIACORE_RESAMPLER_OUTPUT_RATE") {
            self.resampler.output_rate = rate.parse().map_err(|_| {
                MediaCoreError::Config("Invalid MEDIACORE_RESAMPLER_OUTPUT_RATE".to_string())
            })?;
        }

        if let Ok(lookahead) = std::env::var("MEDIACORE_REORDER_LOOKAHEAD") {
            self.reorder.lookahead = lookahead.parse().map_err(|_| {
                MediaCoreError::Config("Invalid MEDIACORE_REORDER_LOOKAHEAD".to_string())
            })?;
        }

        if let Ok(log_level) = std::env::var("MEDIACORE_LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.reorder.lookahead == 0 {
            return Err(MediaCoreError::Config(
                "Reorder lookahead must be at least 1".to_string(),
            ));
        }

        // 0 means keep the stream rate; anything else must be a usable rate.
        if self.resampler.output_rate != 0 && self.resampler.output_rate < 8_000 {
            return Err(MediaCoreError::Config(format!(
                "Resampler output rate {} Hz is below the supported minimum of 8000 Hz",
                self.resampler.output_rate
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(MediaCoreError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mediacore").join("config.toml"))
    }
}
