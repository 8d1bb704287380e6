// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for storyline-digest

use std::fmt;

use serde::{Deserialize, Serialize};
use storyline_git::GitError;
use thiserror::Error;

use crate::validation::{CommitDefect, SchemaViolation, ValidationReport};

/// Pipeline stage at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading history from the repository
    Extract,
    /// Assigning categories and computing statistics
    Classify,
    /// Truncating and chunking into a bounded report
    Reduce,
    /// Branch divergence analysis
    Compare,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Classify => "classify",
            Stage::Reduce => "reduce",
            Stage::Compare => "compare",
        })
    }
}

/// Fatal pipeline errors
///
/// Every variant names its stage; all but `Extraction` carry the validation
/// report as it stood when the pipeline stopped.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The repository could not be read (bad path, branch, time spec, ...)
    #[error("{stage} stage failed: {source}")]
    Extraction {
        /// Stage that was running
        stage: Stage,
        /// Underlying git error
        source: GitError,
    },

    /// Every extracted commit failed per-record validation
    #[error("No valid commits after {stage} stage ({} skipped)", .report.skipped_commits)]
    NoValidCommits {
        /// Stage whose output was empty
        stage: Stage,
        /// Drop reasons for every rejected commit
        report: ValidationReport,
    },

    /// A stage's output did not match its contract under the `raise` policy
    #[error("{stage} stage output failed validation: {violation}")]
    SchemaViolation {
        /// Stage whose output was rejected
        stage: Stage,
        /// What was wrong with the output
        violation: SchemaViolation,
        /// Report snapshot at the point of failure
        report: ValidationReport,
    },

    /// The topology handed to divergence analysis was unusable
    #[error("Invalid branch comparison: {reason}")]
    InvalidComparison {
        /// Stage that rejected the comparison
        stage: Stage,
        /// Defect found in the merge-base commit
        reason: CommitDefect,
        /// Report snapshot at the point of failure
        report: ValidationReport,
    },
}

impl PipelineError {
    /// Stage at which the pipeline stopped
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Extraction { stage, .. }
            | PipelineError::NoValidCommits { stage, .. }
            | PipelineError::SchemaViolation { stage, .. }
            | PipelineError::InvalidComparison { stage, .. } => *stage,
        }
    }

    /// Validation report snapshot, if the failure happened after extraction
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            PipelineError::Extraction { .. } => None,
            PipelineError::NoValidCommits { report, .. }
            | PipelineError::SchemaViolation { report, .. }
            | PipelineError::InvalidComparison { report, .. } => Some(report),
        }
    }
}
