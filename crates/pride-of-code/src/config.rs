//! Configuration for the field, the script executor and scoring.
//!
//! Every section has sensible defaults, so an empty TOML file (or no file at
//! all) yields the same behaviour as `Config::default()`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub field: FieldConfig,
    pub executor: ExecutorConfig,
    pub scoring: ScoringConfig,
}

/// Field extents in yards. Positions are clamped to `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub width: f64,
    pub height: f64,
    /// `y` of the line members start on after `create`/`reset`.
    pub baseline_y: f64,
    /// Distance kept from both sidelines when spreading the baseline.
    pub baseline_margin: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 53.3,
            baseline_y: 10.0,
            baseline_margin: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub default_band_size: usize,
    pub max_band_size: usize,
    /// Statements plus loop iterations a single run may take.
    pub max_steps: u64,
    pub max_collection_len: usize,
    pub max_output_bytes: usize,
    pub max_script_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_band_size: 16,
            max_band_size: 256,
            max_steps: 100_000,
            max_collection_len: 10_000,
            max_output_bytes: 64 * 1024,
            max_script_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points for a passed lesson that doesn't declare its own amount.
    pub base_points: f64,
    /// Multiplier growth per consecutive success after the first.
    pub streak_step: f64,
    pub max_multiplier: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points: 25.0,
            streak_step: 0.1,
            max_multiplier: 2.0,
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_field(&config.field)?;
    validate_executor(&config.executor)?;
    validate_scoring(&config.scoring)?;
    Ok(())
}

fn validate_field(field: &FieldConfig) -> Result<(), ConfigError> {
    if !(field.width.is_finite() && field.width > 0.0) {
        return Err(ConfigError::Invalid(
            "field.width must be a positive number".to_string(),
        ));
    }
    if !(field.height.is_finite() && field.height > 0.0) {
        return Err(ConfigError::Invalid(
            "field.height must be a positive number".to_string(),
        ));
    }
    if !(0.0..=field.height).contains(&field.baseline_y) {
        return Err(ConfigError::Invalid(
            "field.baseline_y must lie within the field".to_string(),
        ));
    }
    if !(field.baseline_margin >= 0.0 && field.baseline_margin * 2.0 <= field.width) {
        return Err(ConfigError::Invalid(
            "field.baseline_margin must be >= 0 and leave room for the baseline".to_string(),
        ));
    }
    Ok(())
}

fn validate_executor(executor: &ExecutorConfig) -> Result<(), ConfigError> {
    if executor.max_band_size == 0 {
        return Err(ConfigError::Invalid(
            "executor.max_band_size must be > 0".to_string(),
        ));
    }
    if executor.default_band_size == 0 || executor.default_band_size > executor.max_band_size {
        return Err(ConfigError::Invalid(
            "executor.default_band_size must be in 1..=max_band_size".to_string(),
        ));
    }
    if executor.max_steps == 0 {
        return Err(ConfigError::Invalid(
            "executor.max_steps must be > 0".to_string(),
        ));
    }
    if executor.max_collection_len == 0 {
        return Err(ConfigError::Invalid(
            "executor.max_collection_len must be > 0".to_string(),
        ));
    }
    if executor.max_output_bytes == 0 || executor.max_script_bytes == 0 {
        return Err(ConfigError::Invalid(
            "executor output and script limits must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    if !(scoring.base_points.is_finite() && scoring.base_points >= 0.0) {
        return Err(ConfigError::Invalid(
            "scoring.base_points must be >= 0".to_string(),
        ));
    }
    if !(scoring.streak_step.is_finite() && scoring.streak_step >= 0.0) {
        return Err(ConfigError::Invalid(
            "scoring.streak_step must be >= 0".to_string(),
        ));
    }
    if !(scoring.max_multiplier.is_finite() && scoring.max_multiplier >= 1.0) {
        return Err(ConfigError::Invalid(
            "scoring.max_multiplier must be >= 1".to_string(),
        ));
    }
    Ok(())
}
