//! Settings for the `resolve-pattern` command
//!
//! Settings are layered; each later layer overrides the keys it sets:
//!
//! 1. Built-in defaults
//! 2. User settings: `~/.pattern-engine/config.toml`
//! 3. Project settings: `./.pattern-engine/config.toml`
//! 4. An explicit `--config` file
//! 5. `PATTERN_ENGINE_*` environment variables
//! 6. Command-line flags
//!
//! The sizing defaults and the environment feature policy belong to the
//! engine and cannot be configured here.

pub mod env;
pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{CatalogSettings, EngineSettings, LoggingSettings, OutputSettings, ValidationSettings};

/// Prefix of every settings environment variable
pub const ENV_PREFIX: &str = "PATTERN_ENGINE_";

/// Settings directory name, under the home and project directories
pub const SETTINGS_DIR: &str = ".pattern-engine";

/// Settings file name
pub const SETTINGS_FILE: &str = "config.toml";
