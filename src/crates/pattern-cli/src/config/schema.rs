//! Settings schema

use pattern_engine::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete settings of the `resolve-pattern` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    /// Pattern catalog location
    #[serde(default)]
    pub catalog: CatalogSettings,

    /// Validation behavior
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Output defaults
    #[serde(default)]
    pub output: OutputSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Pattern catalog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Directory of pattern definition files
    #[serde(default = "default_patterns_dir")]
    pub patterns_dir: PathBuf,
}

fn default_patterns_dir() -> PathBuf {
    PathBuf::from("catalog/patterns")
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            patterns_dir: default_patterns_dir(),
        }
    }
}

/// Validation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationSettings {
    /// Reject config keys a pattern does not declare
    #[serde(default)]
    pub strict: bool,
}

/// Output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    /// Format for single-document input when `--output` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Show timestamps
    #[serde(default)]
    pub timestamps: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored: true,
            timestamps: false,
        }
    }
}
