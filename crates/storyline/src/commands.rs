// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Subcommand execution
//!
//! Each subcommand produces a JSON value for stdout. Pipeline failures are
//! turned into a structured JSON error carrying the stage and the validation
//! report snapshot.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use storyline_digest::{Pipeline, PipelineError};
use storyline_git::{CompareOptions, HistoryExtractor, WalkOptions};
use tracing::debug;

use crate::config::{Command, Config};

/// Run the configured subcommand
///
/// # Errors
///
/// Returns an error if the repository cannot be opened, the pipeline fails,
/// or the result cannot be serialized.
pub fn run(config: &Config) -> Result<Value> {
    let repo = config.repo_path();
    let command = config.resolved_command();
    debug!(repo = %repo.display(), command = ?command, "Running command");

    match command {
        Command::Summarize {
            branch,
            since,
            until,
        } => {
            let pipeline = Pipeline::open(&repo, config.on_validation_error)?;
            let options = WalkOptions {
                branch,
                since,
                until,
            };
            let report = pipeline.summarize(&options)?;
            serde_json::to_value(report).context("Failed to serialize history report")
        }
        Command::Compare {
            base,
            compare,
            since,
            until,
            context,
        } => {
            let pipeline = Pipeline::open(&repo, config.on_validation_error)?;
            let options = CompareOptions {
                since,
                until,
                context_size: context,
            };
            let result = pipeline.compare(&base, &compare, &options)?;
            serde_json::to_value(result).context("Failed to serialize branch comparison")
        }
        Command::Branches => {
            let extractor = HistoryExtractor::open(&repo)
                .with_context(|| format!("Failed to open repository at {}", repo.display()))?;
            let branches = extractor.list_branches()?;
            let current = extractor.current_branch().ok();
            Ok(json!({
                "current": current,
                "branches": branches,
            }))
        }
    }
}

/// Render an error as JSON, with pipeline diagnostics when available
#[must_use]
pub fn error_json(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline_err) => json!({
            "error": pipeline_err.to_string(),
            "stage": pipeline_err.stage(),
            "validation_report": pipeline_err.report(),
        }),
        None => json!({
            "error": format!("{err:#}"),
        }),
    }
}

/// Serialize a value for stdout
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn render(value: &Value, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}
