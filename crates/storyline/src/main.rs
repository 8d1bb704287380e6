//! storyline: turn git history into bounded, validated reports
//!
//! This binary summarizes a branch or compares two branches and prints the
//! result as JSON on stdout. Logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use storyline::commands;
use storyline::config::Config;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(repo = %config.repo_path().display(), policy = %config.on_validation_error, "Starting storyline");

    let outcome = commands::run(&config);
    let (value, code) = match outcome {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(e) => {
            error!("{e:#}");
            (commands::error_json(&e), ExitCode::FAILURE)
        }
    };

    match commands::render(&value, config.pretty) {
        Ok(text) => {
            println!("{text}");
            code
        }
        Err(e) => {
            error!("Failed to render output: {e:#}");
            ExitCode::FAILURE
        }
    }
}
