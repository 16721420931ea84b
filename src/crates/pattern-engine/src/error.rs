//! Error types for the pattern resolution engine
//!
//! Failures fall into three classes that callers must treat differently:
//!
//! - [`EngineError::Format`]: the input stream itself is malformed. Nothing in
//!   it can be trusted, so the whole invocation aborts before any document is
//!   processed.
//! - [`SchemaError`]: one document is invalid. Captured per document inside a
//!   [`Batch`](crate::batch::Batch) and never aborts sibling documents.
//! - [`EngineError::InternalConsistency`]: the pattern catalog violates one of
//!   its invariants. This is a defect in shipped metadata, not in the request,
//!   and is fatal.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input stream
    #[error("Malformed input: {0}")]
    Format(String),

    /// A catalog file could not be read or parsed
    #[error("Failed to load catalog from {path}: {message}")]
    CatalogLoad { path: String, message: String },

    /// A catalog invariant is violated
    #[error("Catalog inconsistency in pattern '{pattern}': {message}")]
    InternalConsistency { pattern: String, message: String },

    /// The only document of a single-document request was rejected
    #[error("Request is invalid: {0}")]
    Rejected(SchemaErrors),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an internal consistency error for a pattern
    pub fn consistency(pattern: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InternalConsistency {
            pattern: pattern.into(),
            message: msg.into(),
        }
    }

    /// True when the error originates in the catalog rather than the input
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            Self::CatalogLoad { .. } | Self::InternalConsistency { .. }
        )
    }
}

/// A per-document validation or resolution failure
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaError {
    /// The requested pattern is not in the catalog
    #[error("Unknown pattern: {pattern}. Available: {}", .available.join(", "))]
    UnknownPattern {
        pattern: String,
        available: Vec<String>,
    },

    /// A required config key is absent
    #[error("Missing required config field: {key}")]
    MissingRequired { key: String },

    /// A config value does not match its declared type
    #[error("Config field '{key}' must be {expected} (got {actual})")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// A config value is outside its declared set of allowed values
    #[error("Config field '{key}' is invalid: {message}")]
    InvalidValue { key: String, message: String },

    /// A config key the pattern does not declare (strict mode only)
    #[error("Unknown config field: {key}")]
    UnknownKey { key: String },

    /// `pattern_version` is absent or not a semantic version
    #[error("{}", version_message(.found))]
    MissingVersion { found: Option<String> },

    /// No sizing-table cell exists for the size and environment
    #[error("Unknown size '{size}' for environment '{environment}'")]
    UnknownSize { size: String, environment: String },

    /// A required envelope field is absent
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// An envelope field is present but malformed
    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },
}

fn version_message(found: &Option<String>) -> String {
    match found {
        Some(value) => format!(
            "pattern_version must be a semantic version (MAJOR.MINOR.PATCH), got '{}'",
            value
        ),
        None => "Missing required field: pattern_version".to_string(),
    }
}

impl SchemaError {
    /// Create an invalid-field error
    pub fn invalid_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a missing-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Every error reported for one document
///
/// Validation reports all problems at once, so a document's failure is a
/// non-empty list rather than a single error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaErrors(Vec<SchemaError>);

impl SchemaErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: SchemaError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaError> {
        self.0.iter()
    }

    /// First reported error, if any
    pub fn first(&self) -> Option<&SchemaError> {
        self.0.first()
    }

    /// Rendered messages, one per error
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl std::error::Error for SchemaErrors {}

impl From<SchemaError> for SchemaErrors {
    fn from(error: SchemaError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<SchemaError>> for SchemaErrors {
    fn from(errors: Vec<SchemaError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SchemaErrors {
    type Item = &'a SchemaError;
    type IntoIter = std::slice::Iter<'a, SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for SchemaErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SchemaErrors", 2)?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("issues", &self.0)?;
        state.end()
    }
}

/// Failure while processing a single document
///
/// `Schema` is recoverable at the batch level, `Engine` aborts the invocation.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    Schema(SchemaErrors),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<SchemaError> for ResolveError {
    fn from(error: SchemaError) -> Self {
        Self::Schema(error.into())
    }
}

impl From<SchemaErrors> for ResolveError {
    fn from(errors: SchemaErrors) -> Self {
        Self::Schema(errors)
    }
}
