//! Monthly cost estimates
//!
//! Looks up `estimated_costs[size][environment]` of the requested pattern.
//! Patterns without a cost table still produce an estimate, with no amount.

use crate::batch::{self, Batch};
use crate::catalog::Catalog;
use crate::error::{Result, SchemaError, SchemaErrors};
use crate::request::{PatternRequest, ValidatedRequest};
use crate::resolver::effective_size;
use crate::types::{Action, Environment, Size};
use crate::validator::Validator;
use serde::Serialize;
use std::fmt;

/// Estimated monthly cost of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub pattern: String,
    pub action: Action,
    pub size: Size,
    pub environment: Environment,
    /// `None` when the pattern publishes no estimate for this cell
    pub estimated_monthly_cost_usd: Option<f64>,
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pattern: {}", self.pattern)?;
        writeln!(f, "Size: {}", self.size)?;
        writeln!(f, "Environment: {}", self.environment)?;
        match self.estimated_monthly_cost_usd {
            Some(cost) => write!(f, "Estimated monthly cost: ${:.2}", cost),
            None => write!(f, "Estimated monthly cost: not available"),
        }
    }
}

/// Estimate the cost of a validated request
pub fn estimate_cost(
    request: &ValidatedRequest,
    catalog: &Catalog,
) -> std::result::Result<CostEstimate, SchemaError> {
    let definition = catalog
        .get(&request.pattern)
        .ok_or_else(|| SchemaError::UnknownPattern {
            pattern: request.pattern.clone(),
            available: catalog.names(),
        })?;
    let size = effective_size(request)?;
    let environment = request.metadata.environment;

    Ok(CostEstimate {
        pattern: definition.name.clone(),
        action: request.action,
        size,
        environment,
        estimated_monthly_cost_usd: definition.estimated_cost(size, environment),
    })
}

/// Validate and estimate every document of a stream, in batch order
pub fn estimate_batch(
    requests: &[PatternRequest],
    validator: &Validator<'_>,
) -> Result<Batch<CostEstimate>> {
    batch::order_with(requests, |request| {
        let validated = validator.validate(request)?;
        Ok(estimate_cost(&validated, validator.catalog())?)
    })
}

/// Successful cost report entry
#[derive(Debug, Serialize)]
pub struct EstimatedRecord<'a> {
    pub index: usize,
    #[serde(flatten)]
    pub estimate: &'a CostEstimate,
}

/// Cost report entry for one document
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CostRecord<'a> {
    Estimated(EstimatedRecord<'a>),
    Failed {
        index: usize,
        pattern: &'a str,
        action: Action,
        error: &'a SchemaErrors,
    },
}

/// JSON cost report: one record per document plus the known total
#[derive(Debug, Serialize)]
pub struct CostReport<'a> {
    pub documents: Vec<CostRecord<'a>>,
    pub total_monthly_cost_usd: f64,
}

impl<'a> CostReport<'a> {
    pub fn from_batch(batch: &'a Batch<CostEstimate>) -> Self {
        let documents = batch
            .iter()
            .map(|entry| match &entry.result {
                Ok(estimate) => CostRecord::Estimated(EstimatedRecord {
                    index: entry.index,
                    estimate,
                }),
                Err(errors) => CostRecord::Failed {
                    index: entry.index,
                    pattern: &entry.pattern,
                    action: entry.action,
                    error: errors,
                },
            })
            .collect();

        let total_monthly_cost_usd = batch
            .iter()
            .filter_map(|entry| entry.value())
            .filter(|estimate| estimate.action == Action::Create)
            .filter_map(|estimate| estimate.estimated_monthly_cost_usd)
            .sum::<f64>();

        Self {
            documents,
            total_monthly_cost_usd,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
