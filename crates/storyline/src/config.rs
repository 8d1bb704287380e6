//! Configuration for the storyline CLI
//!
//! This module provides the command-line surface: the repository to read,
//! the validation policy, logging options and the subcommand to run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storyline_digest::ValidationPolicy;
use storyline_git::DEFAULT_CONTEXT_SIZE;

/// Storyline - turn git history into bounded, validated reports
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "storyline")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Subcommand to run (defaults to summarizing the current branch)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the repository (or any directory inside it)
    ///
    /// Defaults to the current working directory.
    #[arg(short, long, global = true, env = "STORYLINE_REPO")]
    pub repo: Option<PathBuf>,

    /// What to do when a stage produces malformed output: raise or fallback
    ///
    /// `raise` stops with an error naming the stage. `fallback` continues
    /// with degraded output and records a warning in the validation report.
    #[arg(
        long,
        global = true,
        env = "STORYLINE_VALIDATION_POLICY",
        default_value = "raise"
    )]
    pub on_validation_error: ValidationPolicy,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so that stdout stays valid JSON.
    #[arg(short, long, global = true, default_value = "false", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value = "false")]
    pub pretty: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Summarize one branch into a categorized, size-bounded report
    ///
    /// Time bounds accept an absolute timestamp (2025-01-31 or RFC 3339) or
    /// a relative duration such as 3d, 2w, 1m or 1y.
    Summarize {
        /// Branch to summarize (defaults to the current branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Only include commits at or after this time
        #[arg(long)]
        since: Option<String>,

        /// Only include commits at or before this time
        #[arg(long)]
        until: Option<String>,
    },

    /// Compare two branches from their merge base
    Compare {
        /// Base branch
        #[arg(long)]
        base: String,

        /// Branch to compare against the base
        #[arg(long)]
        compare: String,

        /// Only include unique commits at or after this time
        #[arg(long)]
        since: Option<String>,

        /// Only include unique commits at or before this time
        #[arg(long)]
        until: Option<String>,

        /// Number of shared-history commits to include from the merge base
        #[arg(long, default_value_t = DEFAULT_CONTEXT_SIZE)]
        context: usize,
    },

    /// List local branches and the current branch
    Branches,
}

impl Default for Command {
    fn default() -> Self {
        Command::Summarize {
            branch: None,
            since: None,
            until: None,
        }
    }
}

impl Config {
    /// Get the repository path, using the current directory as default
    #[must_use]
    pub fn repo_path(&self) -> PathBuf {
        self.repo
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The subcommand to run
    #[must_use]
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the repository path is specified but doesn't
    /// exist or is not a directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref repo) = self.repo {
            if !repo.exists() {
                return Err(ConfigError::RepositoryNotFound(repo.clone()));
            }
            if !repo.is_dir() {
                return Err(ConfigError::RepositoryNotDirectory(repo.clone()));
            }
        }
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Repository path not found
    #[error("Repository path not found: {0}")]
    RepositoryNotFound(PathBuf),

    /// Repository path is not a directory
    #[error("Repository path is not a directory: {0}")]
    RepositoryNotDirectory(PathBuf),
}
