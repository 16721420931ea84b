//! Output serialization
//!
//! Renders a resolved [`Batch`] for the provisioning backend. `tfvars`,
//! `json` and `env` describe exactly one document; `multi-json` describes a
//! whole batch, failures included.

use crate::batch::{Batch, BatchEntry, Resolution};
use crate::error::{EngineError, Result, SchemaErrors};
use crate::request::Metadata;
use crate::resolver::ResolvedConfiguration;
use crate::types::Action;
use crate::value::{ConfigValue, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Terraform variable definitions
    #[default]
    Tfvars,
    /// Pretty JSON object of the flat configuration
    Json,
    /// `TF_VAR_` environment assignments
    Env,
    /// JSON array describing every document of a batch
    MultiJson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tfvars => "tfvars",
            Self::Json => "json",
            Self::Env => "env",
            Self::MultiJson => "multi-json",
        }
    }

    /// True for formats that describe exactly one document
    pub fn is_single_document(&self) -> bool {
        !matches!(self, Self::MultiJson)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tfvars" => Ok(Self::Tfvars),
            "json" => Ok(Self::Json),
            "env" => Ok(Self::Env),
            "multi-json" | "multi_json" => Ok(Self::MultiJson),
            _ => Err(format!(
                "Invalid output format: {}. Must be tfvars, json, env, or multi-json",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a resolved batch in the given format
///
/// Single-document formats fail with [`EngineError::Format`] unless the batch
/// holds exactly one entry, and with [`EngineError::Rejected`] when that
/// entry failed.
pub fn serialize(batch: &Batch<Resolution>, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::MultiJson {
        return render_multi_json(batch);
    }

    let entry = batch.single().ok_or_else(|| {
        EngineError::format(format!(
            "output format '{}' describes a single document but the input has {}; use multi-json",
            format,
            batch.len()
        ))
    })?;
    let resolution = entry
        .result
        .as_ref()
        .map_err(|errors| EngineError::Rejected(errors.clone()))?;

    match format {
        OutputFormat::Tfvars => Ok(render_tfvars(resolution.config.values())),
        OutputFormat::Json => render_json(resolution.config.values()),
        OutputFormat::Env => Ok(render_env(resolution.config.values())),
        OutputFormat::MultiJson => render_multi_json(batch),
    }
}

/// Render `key = value` lines in key order
pub fn render_tfvars(config: &Settings) -> String {
    config
        .iter()
        .map(|(key, value)| format!("{} = {}", key, hcl_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hcl_value(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(s) => json_string(s),
        ConfigValue::List(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| match item {
                    ConfigValue::String(s) => json_string(s),
                    other => json_compact(other),
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
        ConfigValue::Map(_) => json_compact(value),
        other => other.to_string(),
    }
}

/// Render `TF_VAR_key=value` lines in key order
pub fn render_env(config: &Settings) -> String {
    config
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                ConfigValue::List(_) | ConfigValue::Map(_) => json_compact(value),
                other => other.to_string(),
            };
            format!("TF_VAR_{}={}", key, rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the flat configuration as a pretty JSON object
pub fn render_json(config: &Settings) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn json_compact(value: &ConfigValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Metadata block of a multi-json record
#[derive(Debug, Serialize)]
struct RecordMetadata<'a> {
    #[serde(flatten)]
    metadata: &'a Metadata,
    pattern_version: &'a str,
}

/// One document of a multi-json report
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DocumentRecord<'a> {
    Resolved {
        index: usize,
        pattern: &'a str,
        action: Action,
        state_key: &'a str,
        config: &'a ResolvedConfiguration,
        metadata: RecordMetadata<'a>,
        #[serde(skip_serializing_if = "no_warnings")]
        warnings: &'a [String],
    },
    Failed {
        index: usize,
        pattern: &'a str,
        action: Action,
        error: &'a SchemaErrors,
    },
}

fn no_warnings(warnings: &&[String]) -> bool {
    warnings.is_empty()
}

impl<'a> From<&'a BatchEntry<Resolution>> for DocumentRecord<'a> {
    fn from(entry: &'a BatchEntry<Resolution>) -> Self {
        match &entry.result {
            Ok(resolution) => Self::Resolved {
                index: entry.index,
                pattern: &resolution.request.pattern,
                action: entry.action,
                state_key: &resolution.state_key,
                config: &resolution.config,
                metadata: RecordMetadata {
                    metadata: &resolution.request.metadata,
                    pattern_version: &resolution.request.pattern_version,
                },
                warnings: &resolution.request.warnings,
            },
            Err(errors) => Self::Failed {
                index: entry.index,
                pattern: &entry.pattern,
                action: entry.action,
                error: errors,
            },
        }
    }
}

/// Render every entry as a pretty JSON array, in execution order
pub fn render_multi_json(batch: &Batch<Resolution>) -> Result<String> {
    let records: Vec<DocumentRecord<'_>> = batch.iter().map(DocumentRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Validation outcome of one document
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    pub index: usize,
    pub action: Action,
    pub pattern: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SchemaErrors>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Validation summary of a whole batch
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub document_count: usize,
    pub all_valid: bool,
    pub validations: Vec<ValidationRecord>,
    pub execution_order: Vec<usize>,
    pub create_count: usize,
    pub destroy_count: usize,
}

impl ValidationReport {
    pub fn from_batch(batch: &Batch<Resolution>) -> Self {
        let validations = batch
            .iter()
            .map(|entry| ValidationRecord {
                index: entry.index,
                action: entry.action,
                pattern: entry.pattern.clone(),
                valid: entry.is_valid(),
                error: entry.errors().cloned(),
                warnings: entry
                    .value()
                    .map(|r| r.request.warnings.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            document_count: batch.len(),
            all_valid: batch.all_valid(),
            validations,
            execution_order: batch.execution_order(),
            create_count: batch.create_count(),
            destroy_count: batch.destroy_count(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render the layer that supplied each resolved key
pub fn render_provenance(config: &ResolvedConfiguration) -> String {
    let width = config.values().keys().map(String::len).max().unwrap_or(0);
    config
        .iter()
        .map(|(key, value)| {
            let layer = config
                .source_of(key)
                .map(|layer| layer.as_str())
                .unwrap_or("-");
            format!("{:<width$}  {:<17}  {}", key, layer, value, width = width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
