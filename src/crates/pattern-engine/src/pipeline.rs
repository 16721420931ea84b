//! End-to-end processing of a request stream
//!
//! [`Engine`] owns the catalog and the validation options and runs the
//! parse, validate, resolve, order and serialize stages for one input.

use crate::batch::{self, Batch, Resolution};
use crate::catalog::Catalog;
use crate::cost::{self, CostEstimate};
use crate::error::{EngineError, Result};
use crate::output::{self, OutputFormat};
use crate::request::{parse_documents, PatternRequest};
use crate::validator::{ValidationOptions, Validator};
use std::path::Path;
use tracing::debug;

/// Pattern resolution engine bound to one catalog
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    options: ValidationOptions,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            options: ValidationOptions::default(),
        }
    }

    /// Load the catalog from a patterns directory
    pub fn load(patterns_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Catalog::load_dir(patterns_dir)?))
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> ValidationOptions {
        self.options
    }

    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.catalog).with_options(self.options)
    }

    /// Validate, resolve and order already parsed requests
    pub fn resolve_requests(&self, requests: &[PatternRequest]) -> Result<Batch<Resolution>> {
        batch::order_with_validator(requests, &self.validator())
    }

    /// Parse a YAML stream, then validate, resolve and order it
    pub fn resolve_stream(&self, input: &str) -> Result<Batch<Resolution>> {
        let requests = parse_documents(input)?;
        debug!(documents = requests.len(), "Request stream parsed");
        self.resolve_requests(&requests)
    }

    /// Estimate the monthly cost of every document of a YAML stream
    pub fn estimate_stream(&self, input: &str) -> Result<Batch<CostEstimate>> {
        let requests = parse_documents(input)?;
        cost::estimate_batch(&requests, &self.validator())
    }

    /// Resolve a YAML stream and serialize it
    ///
    /// Without an explicit format, a single document renders as `tfvars`
    /// and several documents as `multi-json`.
    pub fn render_stream(&self, input: &str, format: Option<OutputFormat>) -> Result<String> {
        let batch = self.resolve_stream(input)?;
        let format = select_format(format, batch.len())?;
        output::serialize(&batch, format)
    }
}

/// Pick the output format for a batch of `documents` entries
///
/// An explicit single-document format with several documents is a
/// [`EngineError::Format`].
pub fn select_format(requested: Option<OutputFormat>, documents: usize) -> Result<OutputFormat> {
    match requested {
        None if documents > 1 => Ok(OutputFormat::MultiJson),
        None => Ok(OutputFormat::default()),
        Some(format) if format.is_single_document() && documents > 1 => {
            Err(EngineError::format(format!(
                "output format '{}' supports a single document, found {}; use multi-json",
                format, documents
            )))
        }
        Some(format) => Ok(format),
    }
}
