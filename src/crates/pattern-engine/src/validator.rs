//! Schema validation
//!
//! Checks one [`PatternRequest`] against the [`Catalog`] and produces either a
//! typed [`ValidatedRequest`] or every [`SchemaError`] found in the document.
//! Validation is a pure function of the request, the catalog and the
//! strictness flag.
//!
//! # Example
//!
//! ```rust
//! use pattern_engine::{Catalog, PatternRequest, Validator};
//!
//! # fn example(catalog: &Catalog) -> Result<(), Box<dyn std::error::Error>> {
//! let request = PatternRequest::from_yaml("pattern: keyvault")?;
//! match Validator::new(catalog).strict(true).validate(&request) {
//!     Ok(validated) => println!("valid: {}", validated.pattern),
//!     Err(errors) => eprintln!("invalid: {}", errors),
//! }
//! # Ok(())
//! # }
//! ```

use crate::catalog::{Catalog, PatternDefinition};
use crate::error::{SchemaError, SchemaErrors};
use crate::request::{Metadata, PatternRequest, ValidatedRequest, DEFAULT_LOCATION};
use crate::types::{Action, Environment};
use crate::value::{ConfigValue, Settings};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Request schema version this engine understands
pub const SUPPORTED_REQUEST_VERSION: &str = "1";

/// Config keys every pattern accepts without declaring them
pub const WELL_KNOWN_KEYS: [&str; 2] = ["name", "size"];

const METADATA_KEYS: [&str; 5] = ["project", "environment", "business_unit", "owners", "location"];

pub(crate) const SEMVER_PATTERN: &str = r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$";

/// True if the string is `MAJOR.MINOR.PATCH` with an optional pre-release suffix
pub fn is_semantic_version(version: &str) -> bool {
    static SEMVER: OnceLock<Regex> = OnceLock::new();
    SEMVER
        .get_or_init(|| Regex::new(SEMVER_PATTERN).expect("semantic version pattern is valid"))
        .is_match(version)
}

/// Validation behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject undeclared config keys instead of warning about them
    pub strict: bool,
}

/// Validates request documents against a catalog
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    catalog: &'a Catalog,
    options: ValidationOptions,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set strict handling of undeclared config keys
    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Validate one document, reporting every problem found
    pub fn validate(&self, request: &PatternRequest) -> Result<ValidatedRequest, SchemaErrors> {
        let mut errors = SchemaErrors::new();
        let mut warnings = Vec::new();

        let version = check_version(request.version.as_ref(), &mut errors);
        let action = check_action(request.action.as_ref(), &mut errors);
        let metadata = check_metadata(request.metadata.as_ref(), &mut errors, &mut warnings);
        let definition = self.check_pattern(request.pattern.as_ref(), &mut errors);
        let pattern_version = check_pattern_version(request.pattern_version.as_ref(), &mut errors);
        let raw_config = check_config_shape(request.config.as_ref(), &mut errors);

        let config = match definition {
            Some(definition) => {
                self.check_config(definition, &raw_config, &mut errors, &mut warnings)
            }
            None => raw_config,
        };

        for key in request.extra.keys() {
            warnings.push(format!("Unknown top-level field '{}' ignored", key));
        }

        match (version, action, metadata, definition, pattern_version) {
            (Some(version), Some(action), Some(metadata), Some(definition), Some(pattern_version))
                if errors.is_empty() =>
            {
                for warning in &warnings {
                    warn!(pattern = %definition.name, "{}", warning);
                }
                debug!(
                    pattern = %definition.name,
                    environment = %metadata.environment,
                    action = %action,
                    "Request validated"
                );
                Ok(ValidatedRequest {
                    version,
                    action,
                    metadata,
                    pattern: definition.name.clone(),
                    pattern_version,
                    config,
                    warnings,
                })
            }
            _ => {
                debug!(
                    pattern = request.pattern_name(),
                    errors = errors.len(),
                    "Request failed validation"
                );
                Err(errors)
            }
        }
    }

    fn check_pattern(
        &self,
        pattern: Option<&ConfigValue>,
        errors: &mut SchemaErrors,
    ) -> Option<&'a PatternDefinition> {
        match pattern {
            None => {
                errors.push(SchemaError::missing_field("pattern"));
                None
            }
            Some(ConfigValue::String(name)) => match self.catalog.get(name) {
                Some(definition) => Some(definition),
                None => {
                    errors.push(SchemaError::UnknownPattern {
                        pattern: name.clone(),
                        available: self.catalog.names(),
                    });
                    None
                }
            },
            Some(other) => {
                errors.push(SchemaError::invalid_field(
                    "pattern",
                    format!("must be a string (got {})", other.type_name()),
                ));
                None
            }
        }
    }

    fn check_config(
        &self,
        definition: &PatternDefinition,
        raw: &Settings,
        errors: &mut SchemaErrors,
        warnings: &mut Vec<String>,
    ) -> Settings {
        let mut config = BTreeMap::new();

        for key in definition.required_config_keys() {
            if !raw.contains_key(key) {
                errors.push(SchemaError::MissingRequired { key: key.clone() });
            }
        }

        for (key, value) in raw {
            if let Some(spec) = definition.optional_config_keys().get(key) {
                match spec.check(key, value) {
                    Ok(coerced) => {
                        config.insert(key.clone(), coerced);
                    }
                    Err(e) => errors.push(e),
                }
                continue;
            }

            if key == "size" && !definition.is_required(key) && value.as_str().is_none() {
                errors.push(SchemaError::TypeMismatch {
                    key: key.clone(),
                    expected: "string".to_string(),
                    actual: value.type_name().to_string(),
                });
                continue;
            }

            if !definition.declares(key) {
                if self.options.strict {
                    errors.push(SchemaError::UnknownKey { key: key.clone() });
                    continue;
                }
                warnings.push(format!(
                    "Unknown config field '{}' for pattern {}",
                    key, definition.name
                ));
            }

            config.insert(key.clone(), value.clone());
        }

        config
    }
}

/// Validate a request with default (lenient) options
pub fn validate(request: &PatternRequest, catalog: &Catalog) -> Result<ValidatedRequest, SchemaErrors> {
    Validator::new(catalog).validate(request)
}

fn check_version(version: Option<&ConfigValue>, errors: &mut SchemaErrors) -> Option<String> {
    let rendered = match version {
        None => return Some(SUPPORTED_REQUEST_VERSION.to_string()),
        Some(ConfigValue::String(s)) => s.clone(),
        Some(ConfigValue::Integer(i)) => i.to_string(),
        Some(other) => other.to_string(),
    };

    if rendered == SUPPORTED_REQUEST_VERSION {
        Some(rendered)
    } else {
        errors.push(SchemaError::invalid_field(
            "version",
            format!(
                "unsupported request version '{}' (supported: {})",
                rendered, SUPPORTED_REQUEST_VERSION
            ),
        ));
        None
    }
}

fn check_action(action: Option<&ConfigValue>, errors: &mut SchemaErrors) -> Option<Action> {
    match action {
        None => Some(Action::default()),
        Some(value) => match value.as_str().map(str::parse::<Action>) {
            Some(Ok(action)) => Some(action),
            Some(Err(message)) => {
                errors.push(SchemaError::invalid_field("action", message));
                None
            }
            None => {
                errors.push(SchemaError::invalid_field(
                    "action",
                    format!("Invalid action: {}. Must be 'create' or 'destroy'", value),
                ));
                None
            }
        },
    }
}

fn check_pattern_version(version: Option<&ConfigValue>, errors: &mut SchemaErrors) -> Option<String> {
    let found = match version {
        None | Some(ConfigValue::Null) => None,
        Some(ConfigValue::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value.to_string()),
    };

    match found {
        Some(version) if is_semantic_version(&version) => Some(version),
        found => {
            errors.push(SchemaError::MissingVersion { found });
            None
        }
    }
}

fn check_config_shape(config: Option<&ConfigValue>, errors: &mut SchemaErrors) -> Settings {
    match config {
        None | Some(ConfigValue::Null) => Settings::new(),
        Some(ConfigValue::Map(map)) => map.clone(),
        Some(other) => {
            errors.push(SchemaError::invalid_field(
                "config",
                format!("must be a mapping (got {})", other.type_name()),
            ));
            Settings::new()
        }
    }
}

fn check_metadata(
    metadata: Option<&ConfigValue>,
    errors: &mut SchemaErrors,
    warnings: &mut Vec<String>,
) -> Option<Metadata> {
    let fields = match metadata {
        None => {
            errors.push(SchemaError::missing_field("metadata"));
            return None;
        }
        Some(ConfigValue::Map(fields)) => fields,
        Some(other) => {
            errors.push(SchemaError::invalid_field(
                "metadata",
                format!("must be a mapping (got {})", other.type_name()),
            ));
            return None;
        }
    };

    let before = errors.len();
    let project = required_string(fields, "project", errors);
    let business_unit = required_string(fields, "business_unit", errors);

    let environment = required_string(fields, "environment", errors).and_then(|env| {
        match env.parse::<Environment>() {
            Ok(environment) => Some(environment),
            Err(message) => {
                errors.push(SchemaError::invalid_field("metadata.environment", message));
                None
            }
        }
    });

    let owners = match fields.get("owners") {
        None => {
            errors.push(SchemaError::missing_field("metadata.owners"));
            None
        }
        Some(value) => check_owners(value, errors),
    };

    let location = match fields.get("location") {
        None | Some(ConfigValue::Null) => Some(DEFAULT_LOCATION.to_string()),
        Some(ConfigValue::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(other) => {
            errors.push(SchemaError::invalid_field(
                "metadata.location",
                format!("must be a non-empty string (got {})", other),
            ));
            None
        }
    };

    for key in fields.keys() {
        if !METADATA_KEYS.contains(&key.as_str()) {
            warnings.push(format!("Unknown metadata field '{}' ignored", key));
        }
    }

    if errors.len() > before {
        return None;
    }

    Some(Metadata {
        project: project?,
        environment: environment?,
        business_unit: business_unit?,
        owners: owners?,
        location: location?,
    })
}

fn required_string(
    fields: &BTreeMap<String, ConfigValue>,
    field: &str,
    errors: &mut SchemaErrors,
) -> Option<String> {
    match fields.get(field) {
        None | Some(ConfigValue::Null) => {
            errors.push(SchemaError::missing_field(format!("metadata.{}", field)));
            None
        }
        Some(ConfigValue::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(other) => {
            errors.push(SchemaError::invalid_field(
                format!("metadata.{}", field),
                format!("must be a non-empty string (got {})", other.type_name()),
            ));
            None
        }
    }
}

fn check_owners(value: &ConfigValue, errors: &mut SchemaErrors) -> Option<Vec<String>> {
    let invalid = |message: &str| SchemaError::invalid_field("metadata.owners", message);

    let Some(items) = value.as_list() else {
        errors.push(invalid("must be a list of strings"));
        return None;
    };
    if items.is_empty() {
        errors.push(invalid("must list at least one owner"));
        return None;
    }

    let owners: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string))
        .collect();
    if owners.is_none() {
        errors.push(invalid("every owner must be a non-empty string"));
    }
    owners
}
