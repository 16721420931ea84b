//! JSON Schema for request documents
//!
//! Derived from the catalog so that editors can validate request files
//! before they reach the engine. The schema is advisory: the
//! [`Validator`](crate::Validator) remains the authority.

use crate::catalog::{Catalog, OptionalKeySpec};
use crate::request::DEFAULT_LOCATION;
use crate::types::{Action, Environment, Size};
use crate::validator::{SEMVER_PATTERN, SUPPORTED_REQUEST_VERSION};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// JSON Schema dialect of the generated document
pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Build the request-document schema for a catalog
pub fn request_schema(catalog: &Catalog) -> Value {
    let environments: Vec<&str> = Environment::ALL.iter().map(Environment::as_str).collect();

    json!({
        "$schema": SCHEMA_DIALECT,
        "title": "Infrastructure Pattern Request",
        "description": "A request to provision or destroy one infrastructure pattern. Generated from the pattern catalog.",
        "type": "object",
        "required": ["metadata", "pattern", "pattern_version"],
        "properties": {
            "version": {
                "description": "Request schema version",
                "enum": [SUPPORTED_REQUEST_VERSION, 1],
                "default": SUPPORTED_REQUEST_VERSION
            },
            "action": {
                "type": "string",
                "enum": [Action::Create.as_str(), Action::Destroy.as_str()],
                "default": Action::Create.as_str()
            },
            "metadata": {
                "type": "object",
                "required": ["project", "environment", "business_unit", "owners"],
                "properties": {
                    "project": { "type": "string", "minLength": 1 },
                    "environment": { "type": "string", "enum": environments },
                    "business_unit": { "type": "string", "minLength": 1 },
                    "owners": {
                        "type": "array",
                        "items": { "type": "string", "minLength": 1 },
                        "minItems": 1
                    },
                    "location": { "type": "string", "default": DEFAULT_LOCATION }
                }
            },
            "pattern": {
                "type": "string",
                "enum": catalog.names()
            },
            "pattern_version": {
                "type": "string",
                "pattern": SEMVER_PATTERN,
                "description": "Semantic version of the pattern (MAJOR.MINOR.PATCH)"
            },
            "config": {
                "type": "object",
                "properties": config_properties(catalog)
            }
        },
        "allOf": required_by_pattern(catalog)
    })
}

fn config_properties(catalog: &Catalog) -> Map<String, Value> {
    let sizes: Vec<&str> = Size::ALL.iter().map(Size::as_str).collect();

    let mut properties = Map::new();
    properties.insert(
        "name".to_string(),
        json!({ "type": "string", "description": "Resource name" }),
    );
    properties.insert(
        "size".to_string(),
        json!({
            "type": "string",
            "enum": sizes,
            "description": "T-shirt size. Defaults: dev=small, staging=medium, prod=medium"
        }),
    );

    let mut users: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for pattern in catalog.iter() {
        for key in pattern.required_config_keys() {
            users.entry(key.as_str()).or_default().push(&pattern.name);
            if !properties.contains_key(key.as_str()) {
                properties.insert(key.clone(), json!({ "type": "string" }));
            }
        }
        for (key, spec) in pattern.optional_config_keys() {
            users.entry(key.as_str()).or_default().push(&pattern.name);
            if !properties.contains_key(key.as_str()) {
                properties.insert(key.clone(), optional_property(spec));
            }
        }
    }

    for (key, patterns) in users {
        if let Some(Value::Object(property)) = properties.get_mut(key) {
            let used_by = format!("used by: {}", patterns.join(", "));
            let description = match property.get("description").and_then(Value::as_str) {
                Some(existing) => format!("{} ({})", existing, used_by),
                None => used_by,
            };
            property.insert("description".to_string(), Value::String(description));
        }
    }

    properties
}

fn optional_property(spec: &OptionalKeySpec) -> Value {
    let mut property = Map::new();
    property.insert("type".to_string(), json!(spec.value_type.as_str()));
    if let Some(allowed) = &spec.allowed {
        property.insert("enum".to_string(), json!(allowed));
    }
    if let Some(default) = &spec.default {
        property.insert("default".to_string(), json!(default));
    }
    if let Some(description) = &spec.description {
        property.insert("description".to_string(), json!(description));
    }
    Value::Object(property)
}

fn required_by_pattern(catalog: &Catalog) -> Vec<Value> {
    catalog
        .iter()
        .filter(|pattern| !pattern.required_config_keys().is_empty())
        .map(|pattern| {
            json!({
                "if": {
                    "properties": { "pattern": { "const": pattern.name } },
                    "required": ["pattern"]
                },
                "then": {
                    "required": ["config"],
                    "properties": {
                        "config": { "required": pattern.required_config_keys() }
                    }
                }
            })
        })
        .collect()
}
