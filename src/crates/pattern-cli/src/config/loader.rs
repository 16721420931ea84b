//! Layered settings loader
//!
//! Each settings file is read as a TOML table and merged key by key into the
//! layers below it, so a file only overrides what it actually sets.
//! Environment variables are applied on top of the merged result.

use super::env::{build_env_key, get_env, get_env_bool, get_env_parse};
use super::schema::EngineSettings;
use super::{ENV_PREFIX, SETTINGS_DIR, SETTINGS_FILE};
use crate::error::{CliError, Result};
use pattern_engine::OutputFormat;
use std::path::{Path, PathBuf};
use toml::Table;
use tracing::debug;

/// Loads [`EngineSettings`] from files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
    explicit_config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader for the standard user and project locations
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
            explicit_config_path: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Loader that reads no files and no environment
    pub fn empty() -> Self {
        Self {
            user_config_path: None,
            project_config_path: None,
            explicit_config_path: None,
            env_prefix: String::new(),
        }
    }

    /// User-level settings path (`~/.pattern-engine/config.toml`)
    fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Project-level settings path (`./.pattern-engine/config.toml`)
    fn project_config_path() -> Option<PathBuf> {
        std::env::current_dir()
            .ok()
            .map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn with_user_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_config_path = Some(path.into());
        self
    }

    pub fn with_project_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_config_path = Some(path.into());
        self
    }

    /// Explicit settings file; unlike the standard locations it must exist
    pub fn with_explicit_config(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_config_path = path;
        self
    }

    /// Prefix of the environment variables to read; empty disables them
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load settings, later layers overriding earlier ones
    pub fn load(&self) -> Result<EngineSettings> {
        let mut merged = Table::new();

        for path in [&self.user_config_path, &self.project_config_path]
            .into_iter()
            .flatten()
        {
            if path.is_file() {
                merge_tables(&mut merged, read_table(path)?);
                debug!(path = %path.display(), "Loaded settings file");
            } else {
                debug!(path = %path.display(), "Settings file not found");
            }
        }

        if let Some(path) = &self.explicit_config_path {
            if !path.is_file() {
                return Err(CliError::settings(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            merge_tables(&mut merged, read_table(path)?);
            debug!(path = %path.display(), "Loaded explicit settings file");
        }

        let mut settings: EngineSettings = toml::Value::Table(merged)
            .try_into()
            .map_err(|e| CliError::settings(format!("Invalid settings: {}", e)))?;

        if !self.env_prefix.is_empty() {
            self.apply_env(&mut settings)?;
        }

        Ok(settings)
    }

    /// Apply `{prefix}PATTERNS_DIR`, `STRICT`, `OUTPUT` and `LOG_LEVEL`
    fn apply_env(&self, settings: &mut EngineSettings) -> Result<()> {
        let key = |name: &str| build_env_key(&self.env_prefix, name);

        if let Some(dir) = get_env(&key("patterns_dir"))? {
            settings.catalog.patterns_dir = PathBuf::from(dir);
        }
        if let Some(strict) = get_env_bool(&key("strict"))? {
            settings.validation.strict = strict;
        }
        if let Some(format) = get_env_parse::<OutputFormat>(&key("output"))? {
            settings.output.format = Some(format);
        }
        if let Some(level) = get_env(&key("log_level"))? {
            settings.logging.level = level;
        }
        Ok(())
    }

    pub fn get_user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn get_project_config_path(&self) -> Option<&Path> {
        self.project_config_path.as_deref()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::settings(format!("Failed to read {}: {}", path.display(), e))
    })?;
    content
        .parse::<Table>()
        .map_err(|e| CliError::settings(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Merge `overlay` into `base`; nested tables merge, other values replace
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}
