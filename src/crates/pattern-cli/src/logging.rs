//! Logging setup
//!
//! Logs go to stderr so that stdout carries only the rendered output.
//! `RUST_LOG` directives, when set, refine the configured level.

use crate::config::LoggingSettings;
use crate::error::{CliError, Result};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Parse a log level name: trace, debug, info, warn or error
pub fn parse_level(level: &str) -> Result<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        CliError::Logging(format!(
            "invalid log level '{}', expected trace, debug, info, warn or error",
            level
        ))
    })
}

/// Install the global `fmt` subscriber
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let level = parse_level(&settings.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(settings.colored)
        .with_target(false);

    let installed = if settings.timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
    installed.map_err(|e| CliError::Logging(e.to_string()))
}
