//! Multi-document batches
//!
//! A request stream is processed as a [`Batch`]: every document is handled
//! independently and in input order, then the entries are stably partitioned
//! so that all `destroy` requests come before all `create` requests. A
//! document that fails keeps its slot and its errors; it never aborts its
//! siblings. Only an [`EngineError`](crate::EngineError) (a catalog defect) stops the batch.

use crate::catalog::Catalog;
use crate::error::{ResolveError, Result, SchemaErrors};
use crate::request::{PatternRequest, ValidatedRequest};
use crate::resolver::{self, ResolvedConfiguration};
use crate::types::Action;
use crate::validator::Validator;
use tracing::{debug, info};

/// One document's slot in a batch
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
    /// Zero-based position in the input stream
    pub index: usize,
    /// Action used for ordering
    pub action: Action,
    /// Requested pattern name, `unknown` if absent
    pub pattern: String,
    pub result: std::result::Result<T, SchemaErrors>,
}

impl<T> BatchEntry<T> {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn errors(&self) -> Option<&SchemaErrors> {
        self.result.as_ref().err()
    }
}

/// Ordered per-document results of one invocation
#[derive(Debug, Clone)]
pub struct Batch<T> {
    entries: Vec<BatchEntry<T>>,
}

impl<T> Batch<T> {
    /// Entries in execution order: destroys first, then creates
    pub fn entries(&self) -> &[BatchEntry<T>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchEntry<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all_valid(&self) -> bool {
        self.entries.iter().all(BatchEntry::is_valid)
    }

    /// Input indices of the successful entries, in execution order
    pub fn execution_order(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_valid())
            .map(|e| e.index)
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.count_valid(Action::Create)
    }

    pub fn destroy_count(&self) -> usize {
        self.count_valid(Action::Destroy)
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_valid()).count()
    }

    /// The only entry of a one-document batch
    pub fn single(&self) -> Option<&BatchEntry<T>> {
        match self.entries.as_slice() {
            [entry] => Some(entry),
            _ => None,
        }
    }

    pub fn into_entries(self) -> Vec<BatchEntry<T>> {
        self.entries
    }

    fn count_valid(&self, action: Action) -> usize {
        self.entries
            .iter()
            .filter(|e| e.is_valid() && e.action == action)
            .count()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a BatchEntry<T>;
    type IntoIter = std::slice::Iter<'a, BatchEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Process every request with `process` and order the results
///
/// Schema errors are captured per entry. An engine error aborts the batch
/// and is returned as is.
pub fn order_with<T, F>(requests: &[PatternRequest], mut process: F) -> Result<Batch<T>>
where
    F: FnMut(&PatternRequest) -> std::result::Result<T, ResolveError>,
{
    let mut destroys = Vec::new();
    let mut creates = Vec::new();

    for (index, request) in requests.iter().enumerate() {
        let result = match process(request) {
            Ok(value) => Ok(value),
            Err(ResolveError::Schema(errors)) => {
                debug!(index, pattern = request.pattern_name(), %errors, "Document rejected");
                Err(errors)
            }
            Err(ResolveError::Engine(e)) => return Err(e),
        };

        let entry = BatchEntry {
            index,
            action: request.action(),
            pattern: request.pattern_name().to_string(),
            result,
        };
        match entry.action {
            Action::Destroy => destroys.push(entry),
            Action::Create => creates.push(entry),
        }
    }

    destroys.extend(creates);
    Ok(Batch { entries: destroys })
}

/// A fully resolved document
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub request: ValidatedRequest,
    pub config: ResolvedConfiguration,
    /// Terraform state key of the provisioned resource
    pub state_key: String,
}

/// Terraform state key: `{business_unit}/{environment}/{project}/{pattern}-{name}/terraform.tfstate`
///
/// `name` falls back to the pattern name when the request sets none.
pub fn state_key(request: &ValidatedRequest) -> String {
    let metadata = &request.metadata;
    format!(
        "{}/{}/{}/{}-{}/terraform.tfstate",
        metadata.business_unit,
        metadata.environment,
        metadata.project,
        request.pattern,
        request.name_or(&request.pattern)
    )
}

/// Validate and resolve one document
pub fn resolve_document(
    request: &PatternRequest,
    validator: &Validator<'_>,
) -> std::result::Result<Resolution, ResolveError> {
    let validated = validator.validate(request)?;
    let config = resolver::resolve(&validated, validator.catalog())?;
    let state_key = state_key(&validated);
    Ok(Resolution {
        request: validated,
        config,
        state_key,
    })
}

/// Validate, resolve and order a request stream
pub fn order_with_validator(
    requests: &[PatternRequest],
    validator: &Validator<'_>,
) -> Result<Batch<Resolution>> {
    let batch = order_with(requests, |request| resolve_document(request, validator))?;
    info!(
        documents = batch.len(),
        creates = batch.create_count(),
        destroys = batch.destroy_count(),
        failures = batch.failure_count(),
        "Batch resolved"
    );
    Ok(batch)
}

/// Validate, resolve and order a request stream with lenient validation
pub fn order(requests: &[PatternRequest], catalog: &Catalog) -> Result<Batch<Resolution>> {
    order_with_validator(requests, &Validator::new(catalog))
}
