//! Pattern catalog
//!
//! The catalog is the read-only table of [`PatternDefinition`]s every request
//! is validated and resolved against. It is built once, checked for internal
//! consistency, and then passed by reference into every validator and
//! resolver call.
//!
//! # Definition format
//!
//! ```yaml
//! name: keyvault
//! description: Azure Key Vault for secrets, keys and certificates
//! category: single
//! config:
//!   required: [name]
//!   optional:
//!     soft_delete_retention_days:
//!       type: integer
//!       default: 90
//! sizing:
//!   small:
//!     dev: { sku: standard }
//!     staging: { sku: standard }
//!     prod: { sku: premium }
//!   # medium and large likewise
//! estimated_costs:
//!   small: { dev: 5, staging: 5, prod: 25 }
//! ```
//!
//! The `optional` block may also be written as a list of single-key mappings.

use crate::error::{EngineError, Result, SchemaError};
use crate::resolver::CONDITIONAL_FEATURES;
use crate::types::{Category, Environment, Size};
use crate::value::{ConfigValue, Settings, ValueType};
use crate::validator::WELL_KNOWN_KEYS;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sizing settings per size and environment
pub type SizingTable = BTreeMap<Size, BTreeMap<Environment, Settings>>;

/// Estimated monthly cost in USD per size and environment
pub type CostTable = BTreeMap<Size, BTreeMap<Environment, f64>>;

/// One catalog-registered infrastructure pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Pattern name, unique within the catalog
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Category,

    /// Component patterns of a composite (informational only)
    #[serde(default, alias = "component_patterns")]
    pub components: Vec<String>,

    /// Config key schema
    #[serde(default)]
    pub config: ConfigSchema,

    /// Concrete settings per size and environment
    pub sizing: SizingTable,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_costs: Option<CostTable>,
}

/// Required and optional config keys of a pattern
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_optional_keys")]
    pub optional: BTreeMap<String, OptionalKeySpec>,
}

/// Declaration of one optional config key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionalKeySpec {
    #[serde(rename = "type", default)]
    pub value_type: ValueType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values, when the key is an enumeration
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<ConfigValue>>,
}

impl OptionalKeySpec {
    /// Check a value against this declaration, returning the coerced value
    pub fn check(
        &self,
        key: &str,
        value: &ConfigValue,
    ) -> std::result::Result<ConfigValue, SchemaError> {
        let coerced = self.value_type.coerce(value).ok_or_else(|| {
            SchemaError::TypeMismatch {
                key: key.to_string(),
                expected: self.value_type.to_string(),
                actual: value.type_name().to_string(),
            }
        })?;

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&coerced) {
                let choices: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                return Err(SchemaError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{}' is not one of: {}", coerced, choices.join(", ")),
                });
            }
        }

        Ok(coerced)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionalKeysRepr {
    Map(BTreeMap<String, OptionalKeySpec>),
    List(Vec<BTreeMap<String, OptionalKeySpec>>),
}

fn deserialize_optional_keys<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, OptionalKeySpec>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<OptionalKeysRepr>::deserialize(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(OptionalKeysRepr::Map(keys)) => Ok(keys),
        Some(OptionalKeysRepr::List(items)) => {
            let mut keys = BTreeMap::new();
            for item in items {
                for (key, spec) in item {
                    if keys.insert(key.clone(), spec).is_some() {
                        return Err(de::Error::custom(format!(
                            "duplicate optional config key '{}'",
                            key
                        )));
                    }
                }
            }
            Ok(keys)
        }
    }
}

impl PatternDefinition {
    /// Parse a definition from a YAML string
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn required_config_keys(&self) -> &[String] {
        &self.config.required
    }

    pub fn optional_config_keys(&self) -> &BTreeMap<String, OptionalKeySpec> {
        &self.config.optional
    }

    pub fn component_patterns(&self) -> &[String] {
        &self.components
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.config.required.iter().any(|k| k == key)
    }

    /// True if the key is required, optional or well-known for every pattern
    pub fn declares(&self, key: &str) -> bool {
        self.is_required(key)
            || self.config.optional.contains_key(key)
            || WELL_KNOWN_KEYS.contains(&key)
    }

    /// Sizing settings for one size and environment
    pub fn sizing_cell(&self, size: Size, environment: Environment) -> Option<&Settings> {
        self.sizing.get(&size).and_then(|row| row.get(&environment))
    }

    /// Defaults declared for optional keys
    pub fn optional_defaults(&self) -> Settings {
        self.config
            .optional
            .iter()
            .filter_map(|(key, spec)| spec.default.clone().map(|value| (key.clone(), value)))
            .collect()
    }

    /// Estimated monthly cost for one size and environment
    pub fn estimated_cost(&self, size: Size, environment: Environment) -> Option<f64> {
        self.estimated_costs
            .as_ref()
            .and_then(|costs| costs.get(&size))
            .and_then(|row| row.get(&environment))
            .copied()
    }

    /// First line of the description
    pub fn summary_line(&self) -> &str {
        self.description.lines().next().unwrap_or("").trim()
    }

    /// Check the definition's invariants
    ///
    /// Every size must have a cell for every environment, required and
    /// optional keys must be disjoint, defaults must conform to their
    /// declared types, and sizing cells may set neither required keys nor
    /// conditional feature flags.
    pub fn check_consistency(&self) -> Result<()> {
        let fail = |msg: String| Err(EngineError::consistency(&self.name, msg));

        if self.name.trim().is_empty() {
            return Err(EngineError::consistency("<unnamed>", "pattern name is empty"));
        }

        let mut seen = BTreeSet::new();
        for key in &self.config.required {
            if !seen.insert(key.as_str()) {
                return fail(format!("required config key '{}' is listed twice", key));
            }
            if self.config.optional.contains_key(key) {
                return fail(format!(
                    "config key '{}' is declared both required and optional",
                    key
                ));
            }
        }

        for (key, spec) in &self.config.optional {
            if let Some(default) = &spec.default {
                if let Err(e) = spec.check(key, default) {
                    return fail(format!("default for optional key '{}' is invalid: {}", key, e));
                }
            }
        }

        for size in Size::ALL {
            for environment in Environment::ALL {
                let Some(cell) = self.sizing_cell(size, environment) else {
                    return fail(format!("missing sizing cell {}/{}", size, environment));
                };
                for key in cell.keys() {
                    if self.is_required(key) {
                        return fail(format!(
                            "sizing cell {}/{} sets required key '{}'",
                            size, environment, key
                        ));
                    }
                    if CONDITIONAL_FEATURES.contains(&key.as_str()) {
                        return fail(format!(
                            "sizing cell {}/{} sets conditional feature '{}'",
                            size, environment, key
                        ));
                    }
                }
            }
        }

        if self.category == Category::Composite && self.components.is_empty() {
            warn!(pattern = %self.name, "Composite pattern lists no components");
        }

        Ok(())
    }
}

/// Short listing entry for a pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub components: Vec<String>,
}

/// Immutable table of pattern definitions
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    patterns: BTreeMap<String, PatternDefinition>,
}

impl Catalog {
    /// Build a catalog from definitions, checking every invariant
    pub fn from_definitions(definitions: impl IntoIterator<Item = PatternDefinition>) -> Result<Self> {
        let mut patterns = BTreeMap::new();

        for definition in definitions {
            definition.check_consistency()?;
            let name = definition.name.clone();
            if patterns.insert(name.clone(), definition).is_some() {
                return Err(EngineError::consistency(name, "pattern is defined more than once"));
            }
        }

        Ok(Self { patterns })
    }

    /// Build a catalog from a `---`-separated stream of YAML definitions
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut definitions = Vec::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document).map_err(|e| {
                EngineError::CatalogLoad {
                    path: "<inline>".to_string(),
                    message: e.to_string(),
                }
            })?;
            if value.is_null() {
                continue;
            }
            let definition: PatternDefinition =
                serde_yaml::from_value(value).map_err(|e| EngineError::CatalogLoad {
                    path: "<inline>".to_string(),
                    message: e.to_string(),
                })?;
            definitions.push(definition);
        }
        Self::from_definitions(definitions)
    }

    /// Load every `*.yaml` / `*.yml` definition in a directory
    ///
    /// Fails if the directory is missing, holds no definitions, or any
    /// definition is unreadable or inconsistent.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let load_error = |message: String| EngineError::CatalogLoad {
            path: dir.display().to_string(),
            message,
        };

        if !dir.is_dir() {
            return Err(load_error("patterns directory not found".to_string()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|ext| ext.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(load_error("no pattern definitions found".to_string()));
        }

        let mut definitions = Vec::with_capacity(files.len());
        for path in &files {
            let content = std::fs::read_to_string(path)?;
            let definition =
                PatternDefinition::from_yaml(&content).map_err(|e| EngineError::CatalogLoad {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            debug!(path = %path.display(), pattern = %definition.name, "Loaded pattern definition");
            definitions.push(definition);
        }

        let catalog = Self::from_definitions(definitions)?;
        info!(dir = %dir.display(), patterns = catalog.len(), "Pattern catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&PatternDefinition> {
        self.patterns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Pattern names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDefinition> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Listing of every pattern, sorted by name
    pub fn summaries(&self) -> Vec<PatternSummary> {
        self.iter()
            .map(|p| PatternSummary {
                name: p.name.clone(),
                description: p.summary_line().to_string(),
                category: p.category,
                components: p.components.clone(),
            })
            .collect()
    }
}
