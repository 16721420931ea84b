//! Pattern resolution engine
//!
//! Turns terse infrastructure requests ("a keyvault for project payments in
//! prod") into the complete, flat configuration a provisioning backend
//! consumes. Requests name a catalog pattern, an environment and a handful
//! of explicit values; the engine fills in everything else from the
//! pattern's sizing table, optional-key defaults and environment policy.
//!
//! # Modules
//!
//! - `catalog` - Pattern definitions and the immutable catalog
//! - `request` - Request documents and multi-document stream parsing
//! - `validator` - Schema validation of one request against the catalog
//! - `resolver` - Layered merge of metadata, defaults, sizing and policy
//! - `batch` - Independent per-document processing and destroy-first ordering
//! - `output` - tfvars, JSON, env and multi-document JSON rendering
//! - `cost` - Monthly cost estimates from the catalog
//! - `schema` - JSON Schema for request documents
//! - `pipeline` - The [`Engine`] tying the stages together
//!
//! # Example
//!
//! ```rust,no_run
//! use pattern_engine::{Engine, OutputFormat};
//!
//! # fn main() -> pattern_engine::Result<()> {
//! let engine = Engine::load("catalog/patterns")?;
//! let tfvars = engine.render_stream(
//!     r#"
//! metadata:
//!   project: payments
//!   environment: prod
//!   business_unit: finance
//!   owners: [ops@example.com]
//! pattern: keyvault
//! pattern_version: "1.0.0"
//! config:
//!   name: secrets
//! "#,
//!     Some(OutputFormat::Tfvars),
//! )?;
//! println!("{}", tfvars);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod catalog;
pub mod cost;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod validator;
pub mod value;

pub use batch::{order, order_with, state_key, Batch, BatchEntry, Resolution};
pub use catalog::{Catalog, ConfigSchema, OptionalKeySpec, PatternDefinition, PatternSummary};
pub use cost::{estimate_cost, CostEstimate, CostReport};
pub use error::{EngineError, ResolveError, Result, SchemaError, SchemaErrors};
pub use output::{serialize, OutputFormat, ValidationReport};
pub use pipeline::{select_format, Engine};
pub use request::{parse_documents, Metadata, PatternRequest, ValidatedRequest};
pub use resolver::{conditional_features, resolve, Layer, ResolvedConfiguration};
pub use schema::request_schema;
pub use types::{Action, Category, Environment, Size};
pub use validator::{validate, ValidationOptions, Validator};
pub use value::{ConfigValue, Settings, ValueType};
