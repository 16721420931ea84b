//! Command handlers
//!
//! Every handler writes its result to `out` and diagnostics to `err`, and
//! reports whether all documents were valid.

use crate::apply_flags;
use crate::cli::{Cli, Mode};
use crate::config::EngineSettings;
use crate::error::{CliError, Result, EXIT_INVALID, EXIT_OK};
use pattern_engine::output::{render_provenance, ValidationReport};
use pattern_engine::{
    request_schema, select_format, serialize, Batch, Catalog, CostReport, Engine, EngineError,
    OutputFormat, Resolution, ValidationOptions,
};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Result of a successful invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every document was processed successfully
    Success,
    /// At least one document failed validation
    Invalid,
}

impl Outcome {
    pub fn from_valid(valid: bool) -> Self {
        if valid {
            Self::Success
        } else {
            Self::Invalid
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => EXIT_OK,
            Self::Invalid => EXIT_INVALID,
        }
    }
}

/// Dispatch on the invocation mode
///
/// Flags on `cli` take precedence over `settings`.
pub fn execute(
    cli: &Cli,
    settings: &EngineSettings,
    stdin: &mut dyn Read,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Outcome> {
    let mut settings = settings.clone();
    apply_flags(&mut settings, cli);
    let settings = &settings;

    let engine = load_engine(settings)?;

    match cli.mode() {
        Mode::ListPatterns => list_patterns(engine.catalog(), cli.output, out),
        Mode::Schema => print_schema(engine.catalog(), out),
        mode => {
            let input = read_input(cli.input_path(), stdin)?;
            match mode {
                Mode::Validate => validate(&engine, &input, cli.output, out),
                Mode::Cost => cost(&engine, &input, cli.output, out),
                _ => resolve(&engine, &input, cli, settings, out, err),
            }
        }
    }
}

fn load_engine(settings: &EngineSettings) -> Result<Engine> {
    let engine = Engine::load(&settings.catalog.patterns_dir)?.with_options(ValidationOptions {
        strict: settings.validation.strict,
    });
    info!(
        patterns = engine.catalog().len(),
        strict = settings.validation.strict,
        "Engine ready"
    );
    Ok(engine)
}

/// Read the request stream from a file, or from `stdin` when no path is given
pub fn read_input(path: Option<&Path>, stdin: &mut dyn Read) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Input {
            source_name: path.display().to_string(),
            source,
        }),
        None => {
            let mut input = String::new();
            stdin
                .read_to_string(&mut input)
                .map_err(|source| CliError::Input {
                    source_name: "standard input".to_string(),
                    source,
                })?;
            Ok(input)
        }
    }
}

fn emit(out: &mut dyn Write, text: &str) -> Result<()> {
    writeln!(out, "{}", text).map_err(CliError::Output)
}

fn resolve(
    engine: &Engine,
    input: &str,
    cli: &Cli,
    settings: &EngineSettings,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Outcome> {
    let batch = engine.resolve_stream(input)?;
    let requested = match cli.output {
        Some(format) => Some(format),
        None if batch.len() == 1 => settings.output.format,
        None => None,
    };
    let format = select_format(requested, batch.len())?;

    let rendered = serialize(&batch, format)?;
    emit(out, &rendered)?;

    if cli.explain {
        explain(&batch, err)?;
    }

    if !batch.all_valid() {
        emit(
            err,
            &format!("Error: {} document(s) failed validation", batch.failure_count()),
        )?;
        for entry in batch.iter() {
            if let Some(errors) = entry.errors() {
                emit(err, &format!("  Document {}: {}", entry.index, errors))?;
            }
        }
    }

    Ok(Outcome::from_valid(batch.all_valid()))
}

fn explain(batch: &Batch<Resolution>, err: &mut dyn Write) -> Result<()> {
    for entry in batch.iter() {
        if let Some(resolution) = entry.value() {
            if batch.len() > 1 {
                emit(
                    err,
                    &format!("# document {} ({})", entry.index, resolution.request.pattern),
                )?;
            }
            emit(err, &render_provenance(&resolution.config))?;
        }
    }
    Ok(())
}

fn validate(
    engine: &Engine,
    input: &str,
    output: Option<OutputFormat>,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let batch = engine.resolve_stream(input)?;

    match (batch.single(), output) {
        (Some(entry), None | Some(OutputFormat::Tfvars) | Some(OutputFormat::Env)) => {
            match &entry.result {
                Ok(resolution) => {
                    emit(out, "Request is valid")?;
                    for warning in &resolution.request.warnings {
                        emit(out, &format!("  Warning: {}", warning))?;
                    }
                }
                Err(errors) => {
                    emit(out, "Request is invalid:")?;
                    for message in errors.messages() {
                        emit(out, &format!("  - {}", message))?;
                    }
                }
            }
        }
        _ => emit(out, &ValidationReport::from_batch(&batch).to_json()?)?,
    }

    Ok(Outcome::from_valid(batch.all_valid()))
}

fn cost(
    engine: &Engine,
    input: &str,
    output: Option<OutputFormat>,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let batch = engine.estimate_stream(input)?;

    match (batch.single(), output) {
        (Some(entry), None | Some(OutputFormat::Tfvars) | Some(OutputFormat::Env)) => {
            let estimate = entry
                .result
                .as_ref()
                .map_err(|errors| EngineError::Rejected(errors.clone()))?;
            emit(out, &estimate.to_string())?;
        }
        _ => emit(out, &CostReport::from_batch(&batch).to_json()?)?,
    }

    Ok(Outcome::from_valid(batch.all_valid()))
}

fn list_patterns(
    catalog: &Catalog,
    output: Option<OutputFormat>,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let summaries = catalog.summaries();

    if matches!(output, Some(OutputFormat::Json) | Some(OutputFormat::MultiJson)) {
        let listing: serde_json::Map<String, serde_json::Value> = summaries
            .iter()
            .map(|summary| {
                let entry = serde_json::json!({
                    "description": summary.description,
                    "category": summary.category,
                    "components": summary.components,
                });
                (summary.name.clone(), entry)
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&listing).map_err(EngineError::from)?;
        emit(out, &rendered)?;
        return Ok(Outcome::Success);
    }

    for summary in &summaries {
        let components = if summary.components.is_empty() {
            "-".to_string()
        } else {
            summary.components.join(", ")
        };
        emit(
            out,
            &format!(
                "{}\n  {}\n  Category: {}\n  Components: {}",
                summary.name, summary.description, summary.category, components
            ),
        )?;
    }
    Ok(Outcome::Success)
}

fn print_schema(catalog: &Catalog, out: &mut dyn Write) -> Result<Outcome> {
    let rendered =
        serde_json::to_string_pretty(&request_schema(catalog)).map_err(EngineError::from)?;
    emit(out, &rendered)?;
    Ok(Outcome::Success)
}
