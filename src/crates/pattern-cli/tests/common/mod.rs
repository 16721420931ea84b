//! Common test utilities for the command-line front end

#![allow(dead_code)]

use clap::Parser;
use pattern_cli::{execute, CliError, Cli, EngineSettings, Outcome};
use std::path::PathBuf;

/// Directory holding the shipped pattern catalog
pub fn shipped_patterns_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../catalog/patterns")
}

/// Default settings pointing at the shipped catalog
pub fn settings() -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.catalog.patterns_dir = shipped_patterns_dir();
    settings
}

/// A complete request document
pub fn request_yaml(action: &str, pattern: &str, environment: &str, config: &str) -> String {
    format!(
        "version: \"1\"\naction: {}\nmetadata:\n  project: payments\n  environment: {}\n  business_unit: finance\n  owners: [ops@example.com]\npattern: {}\npattern_version: \"1.0.0\"\nconfig: {}\n",
        action, environment, pattern, config
    )
}

/// Captured result of one invocation
pub struct Run {
    pub result: Result<Outcome, CliError>,
    pub stdout: String,
    pub stderr: String,
}

/// Run the command with `args`, feeding `input` on stdin
pub fn run_with(args: &[&str], settings: &EngineSettings, input: &str) -> Run {
    let argv = std::iter::once("resolve-pattern").chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).expect("Failed to parse arguments");

    let mut stdin = input.as_bytes();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = execute(&cli, settings, &mut stdin, &mut stdout, &mut stderr);

    Run {
        result,
        stdout: String::from_utf8(stdout).expect("stdout is not UTF-8"),
        stderr: String::from_utf8(stderr).expect("stderr is not UTF-8"),
    }
}

/// Run the command against the shipped catalog
pub fn run(args: &[&str], input: &str) -> Run {
    run_with(args, &settings(), input)
}
