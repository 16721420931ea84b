//! Sizing and conditional resolution
//!
//! Turns a [`ValidatedRequest`] into a flat [`ResolvedConfiguration`] by
//! merging an explicit, ordered stack of layers where the last write wins:
//!
//! | order | layer              | source                                   |
//! |-------|--------------------|------------------------------------------|
//! | 0     | `metadata`         | request metadata and resource name       |
//! | 1     | `optional_defaults`| defaults of the pattern's optional keys  |
//! | 2     | `sizing`           | effective size and its sizing-table cell |
//! | 3     | `conditional`      | environment-driven feature flags         |
//! | 4     | `explicit`         | values present in the request's `config` |
//!
//! Operators can therefore override every computed value. The metadata
//! layer falls back to the project for `name`, so presence alone says
//! nothing about required keys: each one must come from the `explicit`
//! layer, otherwise resolution fails with an internal inconsistency.

use crate::catalog::Catalog;
use crate::error::{EngineError, ResolveError, SchemaError};
use crate::request::ValidatedRequest;
use crate::types::{Environment, Size};
use crate::value::{ConfigValue, Settings};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Feature flags computed purely from the target environment
pub const CONDITIONAL_FEATURES: [&str; 4] = [
    "enable_diagnostics",
    "enable_access_review",
    "enable_high_availability",
    "enable_geo_redundant_backup",
];

/// Conditional feature flags for an environment
///
/// Diagnostics are on outside `dev`; access review, high availability and
/// geo-redundant backup are `prod` only. Independent of the pattern.
pub fn conditional_features(environment: Environment) -> Settings {
    let non_dev = matches!(environment, Environment::Staging | Environment::Prod);
    let prod = environment == Environment::Prod;

    Settings::from([
        ("enable_diagnostics".to_string(), ConfigValue::Bool(non_dev)),
        ("enable_access_review".to_string(), ConfigValue::Bool(prod)),
        ("enable_high_availability".to_string(), ConfigValue::Bool(prod)),
        ("enable_geo_redundant_backup".to_string(), ConfigValue::Bool(prod)),
    ])
}

/// Source of a resolved value, in ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Metadata,
    OptionalDefaults,
    Sizing,
    Conditional,
    Explicit,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::OptionalDefaults => "optional_defaults",
            Self::Sizing => "sizing",
            Self::Conditional => "conditional",
            Self::Explicit => "explicit",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered list of settings layers, merged left to right
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<(Layer, Settings)>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer; it takes precedence over every layer pushed before it
    pub fn push(&mut self, layer: Layer, settings: Settings) -> &mut Self {
        self.layers.push((layer, settings));
        self
    }

    pub fn layers(&self) -> &[(Layer, Settings)] {
        &self.layers
    }

    /// Combine all layers, last write wins
    pub fn merge(&self) -> ResolvedConfiguration {
        let mut values = Settings::new();
        let mut sources = BTreeMap::new();

        for (layer, settings) in &self.layers {
            debug!(layer = %layer, keys = settings.len(), "Merging layer");
            for (key, value) in settings {
                values.insert(key.clone(), value.clone());
                sources.insert(key.clone(), *layer);
            }
        }

        ResolvedConfiguration { values, sources }
    }
}

/// The complete, flat output of resolving one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedConfiguration {
    values: Settings,
    sources: BTreeMap<String, Layer>,
}

impl ResolvedConfiguration {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Resolved values, sorted by key
    pub fn values(&self) -> &Settings {
        &self.values
    }

    /// Layer that supplied the final value of a key
    pub fn source_of(&self, key: &str) -> Option<Layer> {
        self.sources.get(key).copied()
    }

    pub fn sources(&self) -> &BTreeMap<String, Layer> {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Settings {
        self.values
    }
}

impl Serialize for ResolvedConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Effective t-shirt size of a request
///
/// `config.size` when present, otherwise the environment default.
pub fn effective_size(request: &ValidatedRequest) -> Result<Size, SchemaError> {
    let environment = request.metadata.environment;
    match request.config.get("size") {
        None => Ok(environment.default_size()),
        Some(value) => value
            .as_str()
            .and_then(|s| s.parse::<Size>().ok())
            .ok_or_else(|| SchemaError::UnknownSize {
                size: value.to_string(),
                environment: environment.to_string(),
            }),
    }
}

/// Resolve a validated request into its flat configuration
///
/// Fails with a [`SchemaError`] when the size has no sizing cell, and with
/// [`EngineError::InternalConsistency`] if a required key was not supplied
/// by the request's `config`, which the validator normally rules out.
pub fn resolve(
    request: &ValidatedRequest,
    catalog: &Catalog,
) -> Result<ResolvedConfiguration, ResolveError> {
    let definition = catalog
        .get(&request.pattern)
        .ok_or_else(|| SchemaError::UnknownPattern {
            pattern: request.pattern.clone(),
            available: catalog.names(),
        })?;

    let environment = request.metadata.environment;
    let size = effective_size(request)?;
    let cell = definition
        .sizing_cell(size, environment)
        .ok_or_else(|| SchemaError::UnknownSize {
            size: size.to_string(),
            environment: environment.to_string(),
        })?;

    let mut sizing = cell.clone();
    sizing.insert("size".to_string(), ConfigValue::from(size.as_str()));

    let mut stack = LayerStack::new();
    stack
        .push(Layer::Metadata, metadata_layer(request))
        .push(Layer::OptionalDefaults, definition.optional_defaults())
        .push(Layer::Sizing, sizing)
        .push(Layer::Conditional, conditional_features(environment))
        .push(Layer::Explicit, request.config.clone());
    let resolved = stack.merge();

    if let Some(missing) = definition
        .required_config_keys()
        .iter()
        .find(|key| resolved.source_of(key) != Some(Layer::Explicit))
    {
        return Err(EngineError::consistency(
            &definition.name,
            format!("required key '{}' was not supplied by the request", missing),
        )
        .into());
    }

    debug!(
        pattern = %definition.name,
        size = %size,
        environment = %environment,
        keys = resolved.len(),
        "Request resolved"
    );
    Ok(resolved)
}

fn metadata_layer(request: &ValidatedRequest) -> Settings {
    let metadata = &request.metadata;
    Settings::from([
        ("project".to_string(), ConfigValue::from(metadata.project.as_str())),
        (
            "environment".to_string(),
            ConfigValue::from(metadata.environment.as_str()),
        ),
        (
            "business_unit".to_string(),
            ConfigValue::from(metadata.business_unit.as_str()),
        ),
        ("owners".to_string(), ConfigValue::from(metadata.owners.clone())),
        ("location".to_string(), ConfigValue::from(metadata.location.as_str())),
        ("pattern_name".to_string(), ConfigValue::from(request.pattern.as_str())),
        ("name".to_string(), ConfigValue::from(metadata.project.as_str())),
    ])
}
