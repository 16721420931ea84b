//! # resolve-pattern
//!
//! Resolves infrastructure pattern requests into Terraform variables.

use clap::Parser;
use pattern_cli::{execute, load_settings, logging, Cli, CliError, Outcome};
use std::io;
use std::process::ExitCode;

fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let settings = load_settings(cli)?;
    logging::init(&settings.logging)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    execute(
        cli,
        &settings,
        &mut stdin.lock(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("Error: {:#}", anyhow::Error::new(e));
            ExitCode::from(code)
        }
    }
}
