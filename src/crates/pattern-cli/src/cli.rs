//! Command-line interface definition

use clap::{ArgGroup, Parser};
use pattern_engine::OutputFormat;
use std::path::{Path, PathBuf};

/// What an invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Resolve,
    Validate,
    Cost,
    ListPatterns,
    Schema,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "resolve-pattern")]
#[command(about = "Resolve infrastructure pattern requests into Terraform variables", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .args(["validate", "cost", "list_patterns", "schema"])
        .multiple(false)
))]
pub struct Cli {
    /// Request file with one or more `---` separated documents; `-` or omitted reads stdin
    pub request_file: Option<PathBuf>,

    /// Output format: tfvars, json, env or multi-json
    #[arg(short, long)]
    pub output: Option<OutputFormat>,

    /// Validate the request without resolving output
    #[arg(long)]
    pub validate: bool,

    /// Show the estimated monthly cost
    #[arg(long)]
    pub cost: bool,

    /// List the patterns in the catalog
    #[arg(long)]
    pub list_patterns: bool,

    /// Print the JSON Schema of request documents
    #[arg(long)]
    pub schema: bool,

    /// Print the layer that supplied each resolved key to stderr
    #[arg(long)]
    pub explain: bool,

    /// Reject config keys the pattern does not declare
    #[arg(long)]
    pub strict: bool,

    /// Directory of pattern definitions
    #[arg(long, env = "PATTERN_ENGINE_PATTERNS_DIR")]
    pub patterns_dir: Option<PathBuf>,

    /// Settings file, applied over the user and project settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "PATTERN_ENGINE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.validate {
            Mode::Validate
        } else if self.cost {
            Mode::Cost
        } else if self.list_patterns {
            Mode::ListPatterns
        } else if self.schema {
            Mode::Schema
        } else {
            Mode::Resolve
        }
    }

    /// Request file path, `None` for stdin
    pub fn input_path(&self) -> Option<&Path> {
        self.request_file
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }
}
