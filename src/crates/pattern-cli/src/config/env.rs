//! Environment variable helpers for settings overrides

use crate::error::{CliError, Result};
use std::env;
use std::str::FromStr;

/// Load an environment variable as a string
///
/// `Ok(None)` when unset, an error when set but not valid UTF-8.
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(CliError::settings(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}

/// Load and parse an environment variable
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => val.parse::<T>().map(Some).map_err(|e| {
            CliError::settings(format!("Failed to parse environment variable {}: {}", key, e))
        }),
        None => Ok(None),
    }
}

/// Load a boolean environment variable (`true/1/yes/on`, `false/0/no/off`)
pub fn get_env_bool(key: &str) -> Result<Option<bool>> {
    match get_env(key)? {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(CliError::settings(format!(
                "Invalid boolean value for {}: {}",
                key, val
            ))),
        },
        None => Ok(None),
    }
}

/// Build a prefixed environment variable name
pub fn build_env_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name.to_uppercase())
}
