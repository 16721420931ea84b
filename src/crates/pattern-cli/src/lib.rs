//! `resolve-pattern` command-line front end
//!
//! Loads layered settings, builds the pattern engine from the configured
//! catalog and runs one of the resolve, validate, cost, list or schema modes.
//!
//! # Modules
//!
//! - `cli` - Argument definitions
//! - `config` - Layered settings (files, environment, flags)
//! - `commands` - Mode handlers
//! - `logging` - `tracing` subscriber setup
//! - `error` - Error type and exit codes

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use cli::{Cli, Mode};
pub use commands::{execute, Outcome};
pub use config::{ConfigLoader, EngineSettings};
pub use error::{CliError, Result};

/// Load settings for an invocation and apply its command-line flags
pub fn load_settings(cli: &Cli) -> Result<EngineSettings> {
    let mut settings = ConfigLoader::new()
        .with_explicit_config(cli.config.clone())
        .load()?;
    apply_flags(&mut settings, cli);
    Ok(settings)
}

/// Apply command-line flags, the highest-precedence settings layer
pub fn apply_flags(settings: &mut EngineSettings, cli: &Cli) {
    if let Some(dir) = &cli.patterns_dir {
        settings.catalog.patterns_dir = dir.clone();
    }
    if cli.strict {
        settings.validation.strict = true;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
}
