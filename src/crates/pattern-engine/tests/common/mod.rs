//! Common test utilities and fixtures

#![allow(dead_code)]

use pattern_engine::{parse_documents, Catalog, PatternRequest};
use std::path::PathBuf;

/// Directory holding the shipped pattern catalog
pub fn shipped_patterns_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../catalog/patterns")
}

/// Load the shipped catalog
pub fn shipped_catalog() -> Catalog {
    Catalog::load_dir(shipped_patterns_dir()).expect("Failed to load shipped catalog")
}

/// A sizing table with distinct values in every cell
fn sizing_block(prefix: &str) -> String {
    let mut yaml = String::from("sizing:\n");
    for size in ["small", "medium", "large"] {
        yaml.push_str(&format!("  {}:\n", size));
        for env in ["dev", "staging", "prod"] {
            yaml.push_str(&format!(
                "    {env}: {{ sku: {prefix}-{size}-{env}, capacity: {cap} }}\n",
                env = env,
                prefix = prefix,
                size = size,
                cap = size.len()
            ));
        }
    }
    yaml
}

/// Synthetic two-pattern catalog, independent of the shipped data
pub fn synthetic_catalog() -> Catalog {
    let yaml = format!(
        r#"name: vault
description: Synthetic secret store
config:
  required: [name]
  optional:
    retention_days:
      type: integer
      default: 90
    public_access:
      type: boolean
      default: false
{vault_sizing}---
name: queue
description: Synthetic message queue
config:
  required: [name, partitions]
  optional:
    tier:
      type: string
      default: basic
      enum: [basic, premium]
{queue_sizing}"#,
        vault_sizing = sizing_block("kv"),
        queue_sizing = sizing_block("q")
    );
    Catalog::from_yaml_str(&yaml).expect("Failed to build synthetic catalog")
}

/// A complete request document
pub fn request_yaml(pattern: &str, environment: &str, config: &str) -> String {
    format!(
        r#"version: "1"
action: create
metadata:
  project: payments
  environment: {environment}
  business_unit: finance
  owners: [ops@example.com]
pattern: {pattern}
pattern_version: "1.0.0"
config: {config}
"#,
        environment = environment,
        pattern = pattern,
        config = config
    )
}

/// Same as [`request_yaml`] with an explicit action
pub fn request_with_action(action: &str, pattern: &str, name: &str) -> String {
    request_yaml(pattern, "dev", &format!("{{ name: {} }}", name))
        .replace("action: create", &format!("action: {}", action))
}

/// Parse a single request document
pub fn request(yaml: &str) -> PatternRequest {
    PatternRequest::from_yaml(yaml).expect("Failed to parse request")
}

/// Parse a multi-document stream built from documents
pub fn stream(documents: &[String]) -> Vec<PatternRequest> {
    parse_documents(&documents.join("---\n")).expect("Failed to parse stream")
}
