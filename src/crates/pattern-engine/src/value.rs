//! Dynamic configuration values
//!
//! Request `config` blocks and catalog sizing cells are open mappings whose
//! shape is only known once a pattern schema is applied. [`ConfigValue`] is
//! the tagged union they are held in; [`ValueType`] is the declared type a
//! pattern assigns to an optional key, and owns the one coercion step applied
//! at the validation boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat key/value settings, ordered by key
pub type Settings = BTreeMap<String, ConfigValue>;

/// A dynamically typed configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Name of the value's type, as used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Map(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            other => match serde_json::to_string(other) {
                Ok(rendered) => write!(f, "{}", rendered),
                // non-finite floats have no JSON form
                Err(_) => write!(f, "{:?}", other),
            },
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
    fn from(map: BTreeMap<String, ConfigValue>) -> Self {
        Self::Map(map)
    }
}

impl From<serde_yaml::Value> for ConfigValue {
    /// Convert a parsed YAML node
    ///
    /// Non-string mapping keys such as `8080: http` are kept under their
    /// textual form, so that the validator can judge them like any other key.
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Sequence(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Mapping(mapping) => Self::Map(
                mapping
                    .into_iter()
                    .map(|(key, value)| (map_key(key), Self::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from(tagged.value),
        }
    }
}

fn map_key(key: serde_yaml::Value) -> String {
    match ConfigValue::from(key) {
        ConfigValue::String(s) => s,
        other => other.to_string(),
    }
}

/// Declared type of an optional config key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "float")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "list")]
    Array,
    #[serde(alias = "map")]
    Object,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Coerce a value to this type
    ///
    /// Returns `None` when the value does not conform. An integral float is
    /// narrowed for `integer`; an integer is accepted as-is for `number`.
    pub fn coerce(&self, value: &ConfigValue) -> Option<ConfigValue> {
        match (self, value) {
            (Self::String, ConfigValue::String(_))
            | (Self::Integer, ConfigValue::Integer(_))
            | (Self::Number, ConfigValue::Integer(_))
            | (Self::Number, ConfigValue::Float(_))
            | (Self::Boolean, ConfigValue::Bool(_))
            | (Self::Array, ConfigValue::List(_))
            | (Self::Object, ConfigValue::Map(_)) => Some(value.clone()),
            (Self::Integer, ConfigValue::Float(f))
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f <= i64::MAX as f64 =>
            {
                Some(ConfigValue::Integer(*f as i64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
