//! CLI error type and exit codes

use pattern_engine::EngineError;
use thiserror::Error;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code: every document is valid
pub const EXIT_OK: u8 = 0;
/// Exit code: one or more documents failed validation
pub const EXIT_INVALID: u8 = 1;
/// Exit code: malformed or unreadable input
pub const EXIT_INPUT: u8 = 3;
/// Exit code: catalog inconsistency or settings error
pub const EXIT_CONFIG: u8 = 4;

/// Errors surfaced by the `resolve-pattern` command
#[derive(Debug, Error)]
pub enum CliError {
    /// The request input could not be read
    #[error("Failed to read {source_name}: {source}")]
    Input {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    /// A settings file or variable is invalid
    #[error("Settings error: {0}")]
    Settings(String),

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Writing output failed
    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl CliError {
    /// Create a settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Input { .. } | Self::Output(_) => EXIT_INPUT,
            Self::Settings(_) | Self::Logging(_) => EXIT_CONFIG,
            Self::Engine(e) if e.is_catalog_error() => EXIT_CONFIG,
            Self::Engine(EngineError::Rejected(_)) => EXIT_INVALID,
            Self::Engine(_) => EXIT_INPUT,
        }
    }
}
