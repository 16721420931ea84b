//! Request documents
//!
//! A [`PatternRequest`] is one document of the input stream exactly as the
//! user wrote it. Every field is held as a dynamic [`ConfigValue`] so that a
//! wrong shape becomes a per-document [`SchemaError`](crate::SchemaError)
//! during validation instead of aborting the whole stream. Validation turns
//! it into a typed [`ValidatedRequest`].

use crate::error::{EngineError, Result};
use crate::types::{Action, Environment};
use crate::value::{ConfigValue, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Location used when a request does not name one
pub const DEFAULT_LOCATION: &str = "eastus";

/// One parsed request document, shape unchecked
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternRequest {
    /// Request schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_version: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigValue>,

    /// Top-level keys the request format does not define
    #[serde(flatten)]
    pub extra: BTreeMap<String, ConfigValue>,
}

impl PatternRequest {
    /// Parse a single request document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut documents = parse_documents(yaml)?;
        match documents.len() {
            1 => Ok(documents.remove(0)),
            n => Err(EngineError::format(format!(
                "expected a single request document, found {}",
                n
            ))),
        }
    }

    /// Split a document's top-level mapping into the request fields
    ///
    /// Explicit `null` values count as absent.
    pub fn from_fields(mut fields: BTreeMap<String, ConfigValue>) -> Self {
        let mut take = |key: &str| fields.remove(key).filter(|value| !value.is_null());
        let version = take("version");
        let action = take("action");
        let metadata = take("metadata");
        let pattern = take("pattern");
        let pattern_version = take("pattern_version");
        let config = take("config");

        Self {
            version,
            action,
            metadata,
            pattern,
            pattern_version,
            config,
            extra: fields,
        }
    }

    /// Action used for batch ordering
    ///
    /// Anything other than an explicit `destroy` orders as `create`; an
    /// invalid action is reported by the validator, not here.
    pub fn action(&self) -> Action {
        match self.action.as_ref().and_then(ConfigValue::as_str) {
            Some("destroy") => Action::Destroy,
            _ => Action::Create,
        }
    }

    /// Pattern name for reporting, `unknown` when absent or malformed
    pub fn pattern_name(&self) -> &str {
        self.pattern
            .as_ref()
            .and_then(ConfigValue::as_str)
            .unwrap_or("unknown")
    }
}

/// Split a `---`-delimited YAML stream into request documents
///
/// Empty documents are skipped. Fails with [`EngineError::Format`] on YAML
/// syntax errors, on a document that is not a mapping, or when the stream
/// holds no documents at all.
pub fn parse_documents(input: &str) -> Result<Vec<PatternRequest>> {
    let mut requests = Vec::new();

    for (position, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| EngineError::format(format!("document {}: {}", position, e)))?;

        match ConfigValue::from(value) {
            ConfigValue::Null => continue,
            ConfigValue::Map(fields) => requests.push(PatternRequest::from_fields(fields)),
            _ => {
                return Err(EngineError::format(format!(
                    "document {} is not a mapping",
                    position
                )))
            }
        }
    }

    if requests.is_empty() {
        return Err(EngineError::format("no documents found in input"));
    }

    Ok(requests)
}

/// Validated request metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub project: String,
    pub environment: Environment,
    pub business_unit: String,
    pub owners: Vec<String>,
    pub location: String,
}

/// A request that passed schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub version: String,
    pub action: Action,
    pub metadata: Metadata,
    pub pattern: String,
    pub pattern_version: String,
    /// Config values after type coercion
    pub config: Settings,
    /// Non-fatal findings, such as undeclared config keys
    pub warnings: Vec<String>,
}

impl ValidatedRequest {
    /// Resource name: `config.name`, falling back to the given default
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.config
            .get("name")
            .and_then(ConfigValue::as_str)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_document() {
        let yaml = r#"
version: "1"
action: create
metadata:
  project: payments
  environment: dev
  business_unit: finance
  owners: [alice@example.com]
pattern: keyvault
pattern_version: "1.0.0"
config:
  name: secrets
"#;
        let request = PatternRequest::from_yaml(yaml).unwrap();
        assert_eq!(request.pattern_name(), "keyvault");
        assert_eq!(request.action(), Action::Create);
        assert!(request.extra.is_empty());
        assert_eq!(
            request.config.as_ref().and_then(|c| c.as_map()).map(|m| m.len()),
            Some(1)
        );
    }

    #[test]
    fn test_parse_multi_document_stream_skips_empty_documents() {
        let yaml = "pattern: a\n---\n---\npattern: b\naction: destroy\n";
        let requests = parse_documents(yaml).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].action(), Action::Destroy);
    }

    #[test]
    fn test_numeric_config_keys_stay_in_their_document() {
        let yaml = "pattern: a\nconfig:\n  name: web\n---\npattern: b\nconfig:\n  8080: http\n";
        let requests = parse_documents(yaml).unwrap();
        assert_eq!(requests.len(), 2);

        let config = requests[1].config.as_ref().and_then(ConfigValue::as_map).unwrap();
        assert_eq!(config.get("8080"), Some(&ConfigValue::from("http")));
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let request = PatternRequest::from_yaml("pattern: a\nversion: ~\naction: null\n").unwrap();
        assert_eq!(request.version, None);
        assert_eq!(request.action, None);
    }

    #[test]
    fn test_unknown_top_level_keys_are_kept() {
        let request = PatternRequest::from_yaml("pattern: a\nticket: OPS-12\n").unwrap();
        assert_eq!(request.extra.get("ticket"), Some(&ConfigValue::from("OPS-12")));
    }

    #[test]
    fn test_invalid_action_orders_as_create() {
        let request = PatternRequest::from_yaml("pattern: a\naction: delete\n").unwrap();
        assert_eq!(request.action(), Action::Create);
    }

    #[test]
    fn test_missing_pattern_reports_unknown() {
        let request = PatternRequest::from_yaml("metadata: {}\n").unwrap();
        assert_eq!(request.pattern_name(), "unknown");
    }

    #[test]
    fn test_malformed_yaml_is_format_error() {
        let err = parse_documents("pattern: [unclosed\n").unwrap_err();
        assert!(matches!(err, EngineError::Format(_)));
    }

    #[test]
    fn test_scalar_document_is_format_error() {
        let err = parse_documents("pattern: a\n---\njust a string\n").unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_empty_stream_is_format_error() {
        assert!(matches!(parse_documents(""), Err(EngineError::Format(_))));
        assert!(matches!(parse_documents("---\n"), Err(EngineError::Format(_))));
    }

    #[test]
    fn test_from_yaml_rejects_multiple_documents() {
        assert!(PatternRequest::from_yaml("pattern: a\n---\npattern: b\n").is_err());
    }
}
