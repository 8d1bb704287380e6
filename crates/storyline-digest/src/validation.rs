// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Validation at pipeline stage boundaries
//!
//! A [`ValidationGate`] sits between every pair of stages. Per-record defects
//! are always recovered by dropping the record and recording a warning.
//! Defects in the shape of a stage's output are escalated according to the
//! [`ValidationPolicy`] chosen when the gate is built:
//!
//! - `raise` stops the pipeline with [`PipelineError::SchemaViolation`].
//! - `fallback` degrades: a bad classification is replaced by per-commit
//!   grouping, and a bad reduction becomes a [`PartialReport`].
//!
//! One gate (and one [`ValidationReport`]) exists per pipeline run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use storyline_git::{BranchComparison, CommitRecord, GitError, parse_timestamp};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::{ClassifiedSet, Stats};
use crate::divergence::DivergenceResult;
use crate::error::{PipelineError, Stage};
use crate::reduce::{HistoryReport, PartialReport, ReducedReport, ReportMetadata};

/// How stage-output violations are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Abort the pipeline with a structured error
    #[default]
    Raise,
    /// Continue with a documented degraded result
    Fallback,
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationPolicy::Raise => "raise",
            ValidationPolicy::Fallback => "fallback",
        })
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raise" => Ok(ValidationPolicy::Raise),
            "fallback" => Ok(ValidationPolicy::Fallback),
            other => Err(format!(
                "Unknown validation policy '{other}' (expected 'raise' or 'fallback')"
            )),
        }
    }
}

/// Diagnostics accumulated over one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Warnings in the order they were raised
    pub warnings: Vec<String>,
    /// Records dropped for failing the per-commit check
    pub skipped_commits: usize,
    /// Records examined by the per-commit check
    pub total_commits_processed: usize,
}

impl ValidationReport {
    /// Record a warning and emit it as a log event
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// True if nothing was dropped or degraded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.skipped_commits == 0
    }
}

/// Why a single commit failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitDefect {
    /// A required field is empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The timestamp is not an absolute point in time
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),
}

/// Why a stage's output was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// A required part of the output is absent
    #[error("Missing required key: {0}")]
    MissingKey(&'static str),

    /// A commit inside a classification bucket is malformed
    #[error("In group '{group}': {defect}")]
    GroupRecord {
        /// Label of the bucket holding the commit
        group: String,
        /// The commit's defect
        defect: CommitDefect,
    },

    /// A reduced commit digest lost one of its identifying fields
    #[error("In digest record {index}: {defect}")]
    DigestRecord {
        /// Position in the digest list
        index: usize,
        /// The digest's defect
        defect: CommitDefect,
    },

    /// Two counts that must agree do not
    #[error("Count mismatch in {key}: expected {expected}, found {found}")]
    CountMismatch {
        /// The field whose count disagrees
        key: &'static str,
        /// Count implied by the output's contents
        expected: usize,
        /// Count the output reports
        found: usize,
    },
}

fn check_fields(
    hash: &str,
    author: &str,
    message: &str,
    timestamp: &str,
) -> Result<(), CommitDefect> {
    for (name, value) in [
        ("hash", hash),
        ("author", author),
        ("message", message),
        ("timestamp", timestamp),
    ] {
        if value.trim().is_empty() {
            return Err(CommitDefect::MissingField(name));
        }
    }
    if parse_timestamp(timestamp).is_none() {
        return Err(CommitDefect::InvalidTimestamp(timestamp.to_string()));
    }
    Ok(())
}

/// Check that a commit carries every required field
///
/// # Errors
///
/// Returns the first defect found: an empty hash, author, message or
/// timestamp, or a timestamp that is not an absolute point in time.
pub fn validate_commit(commit: &CommitRecord) -> Result<(), CommitDefect> {
    check_fields(
        &commit.hash,
        &commit.author,
        &commit.message,
        &commit.timestamp,
    )
}

/// Keep the valid commits, dropping and reporting the rest
pub fn validate_commits(
    commits: Vec<CommitRecord>,
    report: &mut ValidationReport,
) -> Vec<CommitRecord> {
    report.total_commits_processed += commits.len();

    commits
        .into_iter()
        .filter(|commit| match validate_commit(commit) {
            Ok(()) => true,
            Err(defect) => {
                let id = if commit.hash.trim().is_empty() {
                    "unknown"
                } else {
                    commit.hash.as_str()
                };
                report.skipped_commits += 1;
                report.add_warning(format!("Skipped commit {id}: {defect}"));
                false
            }
        })
        .collect()
}

/// Check the classification stage's output
///
/// # Errors
///
/// Returns the first violation found.
pub fn check_classified(set: &ClassifiedSet) -> Result<(), SchemaViolation> {
    let stats = set.stats.as_ref().ok_or(SchemaViolation::MissingKey("stats"))?;
    if set.buckets.is_empty() && stats.total_commits > 0 {
        return Err(SchemaViolation::MissingKey("buckets"));
    }

    for bucket in &set.buckets {
        for commit in &bucket.commits {
            validate_commit(commit).map_err(|defect| SchemaViolation::GroupRecord {
                group: bucket.label.clone(),
                defect,
            })?;
        }
    }

    if stats.total_commits != set.len() {
        return Err(SchemaViolation::CountMismatch {
            key: "stats.total_commits",
            expected: set.len(),
            found: stats.total_commits,
        });
    }
    Ok(())
}

/// Check the reduction stage's output
///
/// # Errors
///
/// Returns the first violation found.
pub fn check_reduced(reduced: &ReducedReport) -> Result<(), SchemaViolation> {
    if reduced.stats.is_none() {
        return Err(SchemaViolation::MissingKey("stats"));
    }
    if reduced.digest.trim().is_empty() && !reduced.commits.is_empty() {
        return Err(SchemaViolation::MissingKey("digest"));
    }

    for (index, digest) in reduced.commits.iter().enumerate() {
        check_fields(
            &digest.hash,
            &digest.author,
            &digest.message,
            &digest.timestamp,
        )
        .map_err(|defect| SchemaViolation::DigestRecord { index, defect })?;
    }

    if reduced.metadata.records_kept != reduced.commits.len() {
        return Err(SchemaViolation::CountMismatch {
            key: "metadata.records_kept",
            expected: reduced.commits.len(),
            found: reduced.metadata.records_kept,
        });
    }
    Ok(())
}

/// Where a pipeline run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing admitted yet
    Init,
    /// Extracted commits passed per-record validation
    Extracted,
    /// Classification output admitted
    Classified,
    /// Reduction output admitted
    Reduced,
    /// Final result produced
    Done,
    /// Stopped at the given stage
    Failed(Stage),
}

/// Per-run validation state machine
#[derive(Debug)]
pub struct ValidationGate {
    policy: ValidationPolicy,
    state: PipelineState,
    report: ValidationReport,
    // Retained only under the fallback policy, to rebuild degraded output
    validated: Vec<CommitRecord>,
}

impl ValidationGate {
    /// Create a gate for one pipeline run
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            state: PipelineState::Init,
            report: ValidationReport::default(),
            validated: Vec::new(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Report accumulated so far
    #[must_use]
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    fn advance(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline state transition");
        self.state = next;
    }

    /// Record a fatal extraction error
    pub fn reject_extraction(&mut self, source: GitError) -> PipelineError {
        self.advance(PipelineState::Failed(Stage::Extract));
        PipelineError::Extraction {
            stage: Stage::Extract,
            source,
        }
    }

    /// Decide what a stage-output violation means under the active policy
    ///
    /// Under `raise` this is the pipeline's error; under `fallback` the
    /// violation is handed back so the caller can degrade.
    fn escalate(
        &mut self,
        stage: Stage,
        violation: SchemaViolation,
    ) -> Result<SchemaViolation, PipelineError> {
        match self.policy {
            ValidationPolicy::Raise => {
                self.advance(PipelineState::Failed(stage));
                Err(PipelineError::SchemaViolation {
                    stage,
                    violation,
                    report: self.report.clone(),
                })
            }
            ValidationPolicy::Fallback => Ok(violation),
        }
    }

    /// Validate extracted commits
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoValidCommits` if every commit is dropped,
    /// regardless of policy.
    pub fn admit_commits(
        &mut self,
        commits: Vec<CommitRecord>,
    ) -> Result<Vec<CommitRecord>, PipelineError> {
        let valid = validate_commits(commits, &mut self.report);
        if valid.is_empty() {
            self.advance(PipelineState::Failed(Stage::Extract));
            return Err(PipelineError::NoValidCommits {
                stage: Stage::Extract,
                report: self.report.clone(),
            });
        }

        if self.policy == ValidationPolicy::Fallback {
            self.validated.clone_from(&valid);
        }
        self.advance(PipelineState::Extracted);
        Ok(valid)
    }

    /// Validate the classification output
    ///
    /// Under `fallback`, a violation is replaced by per-commit grouping of the
    /// admitted commits.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaViolation` under `raise`.
    pub fn admit_classified(
        &mut self,
        classified: ClassifiedSet,
    ) -> Result<ClassifiedSet, PipelineError> {
        let classified = match check_classified(&classified) {
            Ok(()) => classified,
            Err(violation) => {
                let violation = self.escalate(Stage::Classify, violation)?;
                self.report.add_warning(format!(
                    "Classification output validation failed: {violation}; \
                     continuing with per-commit grouping"
                ));
                ClassifiedSet::per_commit(self.validated.clone())
            }
        };
        self.advance(PipelineState::Classified);
        Ok(classified)
    }

    /// Validate the reduction output and produce the run's final report
    ///
    /// Under `fallback`, a violation yields a [`PartialReport`] built from the
    /// admitted commits.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaViolation` under `raise`.
    pub fn admit_reduced(&mut self, reduced: ReducedReport) -> Result<HistoryReport, PipelineError> {
        match check_reduced(&reduced) {
            Ok(()) => {
                self.advance(PipelineState::Reduced);
                let mut reduced = reduced;
                reduced.metadata.validation_report = Some(self.report.clone());
                self.advance(PipelineState::Done);
                Ok(HistoryReport::Complete(reduced))
            }
            Err(violation) => {
                let violation = self.escalate(Stage::Reduce, violation)?;
                self.report
                    .add_warning(format!("Reduction output validation failed: {violation}"));
                let commits = std::mem::take(&mut self.validated);
                let metadata = ReportMetadata {
                    records_kept: commits.len(),
                    records_discarded: 0,
                    categories_present: Vec::new(),
                    validation_report: Some(self.report.clone()),
                };
                self.advance(PipelineState::Done);
                Ok(HistoryReport::Partial(PartialReport::new(
                    commits,
                    Stats::default(),
                    metadata,
                )))
            }
        }
    }

    /// Validate the topology of a branch comparison
    ///
    /// The merge base must pass the per-commit check; each side's commits and
    /// the context window are filtered with drop and warning.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidComparison` if the merge base is
    /// malformed, regardless of policy.
    pub fn admit_comparison(
        &mut self,
        comparison: BranchComparison,
    ) -> Result<BranchComparison, PipelineError> {
        if let Err(reason) = validate_commit(&comparison.merge_base) {
            return Err(self.reject_comparison(reason));
        }

        let BranchComparison {
            base_branch,
            compare_branch,
            merge_base,
            base_only,
            compare_only,
            context,
        } = comparison;

        let admitted = BranchComparison {
            base_branch,
            compare_branch,
            merge_base,
            base_only: validate_commits(base_only, &mut self.report),
            compare_only: validate_commits(compare_only, &mut self.report),
            context: validate_commits(context, &mut self.report),
        };
        self.advance(PipelineState::Extracted);
        Ok(admitted)
    }

    /// Record a comparison that could not be analyzed
    pub fn reject_comparison(&mut self, reason: CommitDefect) -> PipelineError {
        self.advance(PipelineState::Failed(Stage::Compare));
        PipelineError::InvalidComparison {
            stage: Stage::Compare,
            reason,
            report: self.report.clone(),
        }
    }

    /// Attach the run's report to a finished comparison
    #[must_use]
    pub fn finish_comparison(&mut self, mut result: DivergenceResult) -> DivergenceResult {
        result.validation_report = Some(self.report.clone());
        self.advance(PipelineState::Done);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classify, CommitClassifier};
    use crate::reduce::{DataReducer, PARTIAL_DIGEST_PLACEHOLDER, Reduce};
    use similar_asserts::assert_eq;

    fn commit(hash: &str, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            author: "Test Author".to_string(),
            email: "test@example.com".to_string(),
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("raise".parse::<ValidationPolicy>(), Ok(ValidationPolicy::Raise));
        assert_eq!(
            "Fallback".parse::<ValidationPolicy>(),
            Ok(ValidationPolicy::Fallback)
        );
        assert!("ignore".parse::<ValidationPolicy>().is_err());
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::Raise);
    }

    #[test]
    fn test_validate_commit_ok() {
        assert_eq!(validate_commit(&commit("abc", "feat: x")), Ok(()));
    }

    #[test]
    fn test_validate_commit_missing_fields() {
        let mut missing_author = commit("abc", "feat: x");
        missing_author.author = "   ".to_string();
        assert_eq!(
            validate_commit(&missing_author),
            Err(CommitDefect::MissingField("author"))
        );

        let missing_message = commit("abc", "");
        assert_eq!(
            validate_commit(&missing_message),
            Err(CommitDefect::MissingField("message"))
        );
    }

    #[test]
    fn test_validate_commit_bad_timestamp() {
        let mut bad = commit("abc", "feat: x");
        bad.timestamp = "last tuesday".to_string();
        assert_eq!(
            validate_commit(&bad),
            Err(CommitDefect::InvalidTimestamp("last tuesday".to_string()))
        );
    }

    #[test]
    fn test_validate_commit_accepts_offset_and_naive() {
        let mut offset = commit("abc", "x");
        offset.timestamp = "2026-01-10T10:00:00+05:30".to_string();
        assert!(validate_commit(&offset).is_ok());

        let mut naive = commit("abc", "x");
        naive.timestamp = "2026-01-10T10:00:00".to_string();
        assert!(validate_commit(&naive).is_ok());
    }

    #[test]
    fn test_validate_commits_drops_and_warns() {
        let mut no_hash = commit("", "feat: x");
        no_hash.hash = String::new();
        let mut no_author = commit("bad1", "fix: y");
        no_author.author = String::new();

        let mut report = ValidationReport::default();
        let kept = validate_commits(
            vec![commit("good", "ok"), no_hash, no_author],
            &mut report,
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(report.skipped_commits, 2);
        assert_eq!(report.total_commits_processed, 3);
        assert_eq!(
            report.warnings,
            vec![
                "Skipped commit unknown: Missing required field: hash".to_string(),
                "Skipped commit bad1: Missing required field: author".to_string(),
            ]
        );
    }

    #[test]
    fn test_check_classified_missing_stats() {
        let mut set = CommitClassifier::new().classify(vec![commit("a1", "feat: x")]);
        set.stats = None;
        assert_eq!(
            check_classified(&set),
            Err(SchemaViolation::MissingKey("stats"))
        );
    }

    #[test]
    fn test_check_classified_missing_buckets() {
        let mut set = CommitClassifier::new().classify(vec![commit("a1", "feat: x")]);
        set.buckets.clear();
        assert_eq!(
            check_classified(&set),
            Err(SchemaViolation::MissingKey("buckets"))
        );
    }

    #[test]
    fn test_check_classified_nested_commit() {
        let mut set = CommitClassifier::new().classify(vec![commit("a1", "feat: x")]);
        set.buckets[0].commits[0].timestamp = String::new();
        assert_eq!(
            check_classified(&set),
            Err(SchemaViolation::GroupRecord {
                group: "feature".to_string(),
                defect: CommitDefect::MissingField("timestamp"),
            })
        );
    }

    #[test]
    fn test_check_reduced_digest_fields() {
        let set = CommitClassifier::new().classify(vec![commit("a1", "feat: x")]);
        let mut reduced = DataReducer::new().reduce(set);
        assert_eq!(check_reduced(&reduced), Ok(()));

        reduced.commits[0].author = String::new();
        assert_eq!(
            check_reduced(&reduced),
            Err(SchemaViolation::DigestRecord {
                index: 0,
                defect: CommitDefect::MissingField("author"),
            })
        );
    }

    #[test]
    fn test_gate_happy_path_states() {
        let mut gate = ValidationGate::new(ValidationPolicy::Raise);
        assert_eq!(gate.state(), PipelineState::Init);

        let commits = gate
            .admit_commits(vec![commit("a1", "feat: x"), commit("b2", "fix: y")])
            .expect("admit commits");
        assert_eq!(gate.state(), PipelineState::Extracted);

        let classified = gate
            .admit_classified(CommitClassifier::new().classify(commits))
            .expect("admit classified");
        assert_eq!(gate.state(), PipelineState::Classified);

        let report = gate
            .admit_reduced(DataReducer::new().reduce(classified))
            .expect("admit reduced");
        assert_eq!(gate.state(), PipelineState::Done);
        assert!(!report.is_partial());
        assert_eq!(
            report.metadata().validation_report.as_ref().map(|r| r.total_commits_processed),
            Some(2)
        );
    }

    #[test]
    fn test_gate_no_valid_commits_is_fatal_under_fallback() {
        let mut gate = ValidationGate::new(ValidationPolicy::Fallback);
        let result = gate.admit_commits(vec![commit("", "x")]);
        match result {
            Err(PipelineError::NoValidCommits { stage, report }) => {
                assert_eq!(stage, Stage::Extract);
                assert_eq!(report.skipped_commits, 1);
            }
            other => panic!("Expected NoValidCommits, got {other:?}"),
        }
        assert_eq!(gate.state(), PipelineState::Failed(Stage::Extract));
    }

    #[test]
    fn test_gate_raise_on_classified_violation() {
        let mut gate = ValidationGate::new(ValidationPolicy::Raise);
        let commits = gate.admit_commits(vec![commit("a1", "x")]).expect("admit");
        let mut set = CommitClassifier::new().classify(commits);
        set.stats = None;

        match gate.admit_classified(set) {
            Err(PipelineError::SchemaViolation {
                stage, violation, ..
            }) => {
                assert_eq!(stage, Stage::Classify);
                assert_eq!(violation, SchemaViolation::MissingKey("stats"));
            }
            other => panic!("Expected SchemaViolation, got {other:?}"),
        }
        assert_eq!(gate.state(), PipelineState::Failed(Stage::Classify));
    }

    #[test]
    fn test_gate_fallback_classification_per_commit() {
        let mut gate = ValidationGate::new(ValidationPolicy::Fallback);
        let commits = gate
            .admit_commits(vec![commit("a1", "feat: x"), commit("b2", "fix: y")])
            .expect("admit");
        let mut set = CommitClassifier::new().classify(commits);
        set.stats = None;

        let degraded = gate.admit_classified(set).expect("fallback");
        let labels: Vec<_> = degraded.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["a1", "b2"]);
        assert_eq!(gate.report().warnings.len(), 1);
        assert!(gate.report().warnings[0].contains("stats"));
        assert_eq!(gate.state(), PipelineState::Classified);
    }

    #[test]
    fn test_gate_fallback_reduction_is_partial() {
        let mut gate = ValidationGate::new(ValidationPolicy::Fallback);
        let commits = gate.admit_commits(vec![commit("a1", "feat: x")]).expect("admit");
        let classified = gate
            .admit_classified(CommitClassifier::new().classify(commits))
            .expect("classified");
        let mut reduced = DataReducer::new().reduce(classified);
        reduced.stats = None;

        let report = gate.admit_reduced(reduced).expect("partial");
        assert!(report.is_partial());
        assert_eq!(report.digest(), PARTIAL_DIGEST_PLACEHOLDER);
        let HistoryReport::Partial(partial) = report else {
            panic!("Expected partial report");
        };
        assert_eq!(partial.commits.len(), 1);
        assert_eq!(partial.stats, Stats::default());
        let warnings = &partial
            .metadata
            .validation_report
            .as_ref()
            .expect("report attached")
            .warnings;
        assert!(warnings.iter().any(|w| w.contains("stats")));
    }

    #[test]
    fn test_gate_rejects_invalid_merge_base() {
        let mut gate = ValidationGate::new(ValidationPolicy::Fallback);
        let comparison = BranchComparison {
            base_branch: "main".to_string(),
            compare_branch: "topic".to_string(),
            merge_base: CommitRecord::default(),
            base_only: Vec::new(),
            compare_only: Vec::new(),
            context: Vec::new(),
        };
        match gate.admit_comparison(comparison) {
            Err(PipelineError::InvalidComparison { stage, reason, .. }) => {
                assert_eq!(stage, Stage::Compare);
                assert_eq!(reason, CommitDefect::MissingField("hash"));
            }
            other => panic!("Expected InvalidComparison, got {other:?}"),
        }
    }

    #[test]
    fn test_gate_filters_comparison_sides() {
        let mut gate = ValidationGate::new(ValidationPolicy::Raise);
        let comparison = BranchComparison {
            base_branch: "main".to_string(),
            compare_branch: "topic".to_string(),
            merge_base: commit("m0", "base"),
            base_only: vec![commit("a1", "x"), commit("", "broken")],
            compare_only: vec![commit("b1", "y")],
            context: vec![commit("m0", "base")],
        };
        let admitted = gate.admit_comparison(comparison).expect("admit");
        assert_eq!(admitted.base_only.len(), 1);
        assert_eq!(gate.report().skipped_commits, 1);
        assert_eq!(gate.report().total_commits_processed, 4);
    }
}
