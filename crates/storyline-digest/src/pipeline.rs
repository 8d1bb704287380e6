// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! End-to-end pipeline
//!
//! Wires extraction, classification and reduction together with a fresh
//! [`ValidationGate`] between every stage. Stages are injected through the
//! [`CommitSource`], [`Classify`] and [`Reduce`] traits so that each boundary
//! can be exercised in isolation.

use std::path::Path;

use chrono::{DateTime, Utc};
use storyline_git::{
    BranchComparison, CommitRecord, CompareOptions, GitError, HistoryExtractor, WalkOptions,
};
use tracing::{debug, info};

use crate::classify::{Classify, CommitClassifier};
use crate::divergence::{DivergenceAnalyzer, DivergenceResult};
use crate::error::{PipelineError, Stage};
use crate::reduce::{DataReducer, HistoryReport, Reduce};
use crate::validation::{ValidationGate, ValidationPolicy};

/// Where commit history comes from
pub trait CommitSource {
    /// List commits on a branch, newest first
    ///
    /// # Errors
    ///
    /// Returns `GitError` if the history cannot be read.
    fn list_commits(
        &self,
        options: &WalkOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, GitError>;

    /// Resolve the topology of two branches
    ///
    /// # Errors
    ///
    /// Returns `GitError` if either branch is missing or they share no history.
    fn compare_branches(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
        now: DateTime<Utc>,
    ) -> Result<BranchComparison, GitError>;
}

impl CommitSource for HistoryExtractor {
    fn list_commits(
        &self,
        options: &WalkOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, GitError> {
        self.list_commits_at(options, now)
    }

    fn compare_branches(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
        now: DateTime<Utc>,
    ) -> Result<BranchComparison, GitError> {
        self.compare_branches_at(base, compare, options, now)
    }
}

/// History pipeline over a commit source
pub struct Pipeline<S, C = CommitClassifier, R = DataReducer> {
    source: S,
    classifier: C,
    reducer: R,
    analyzer: DivergenceAnalyzer,
    policy: ValidationPolicy,
}

impl Pipeline<HistoryExtractor> {
    /// Open the repository containing `path`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Extraction` if no repository is found.
    pub fn open(path: impl AsRef<Path>, policy: ValidationPolicy) -> Result<Self, PipelineError> {
        let source = HistoryExtractor::open(path).map_err(|source| PipelineError::Extraction {
            stage: Stage::Extract,
            source,
        })?;
        debug!(git_dir = %source.path().display(), "Opened repository");
        Ok(Self::new(source, policy))
    }
}

impl<S: CommitSource> Pipeline<S> {
    /// Build a pipeline with the standard classifier and reducer
    pub fn new(source: S, policy: ValidationPolicy) -> Self {
        Self {
            source,
            classifier: CommitClassifier::new(),
            reducer: DataReducer::new(),
            analyzer: DivergenceAnalyzer::new(),
            policy,
        }
    }
}

impl<S, C, R> Pipeline<S, C, R> {
    /// Replace the classification stage
    pub fn with_classifier<C2: Classify>(self, classifier: C2) -> Pipeline<S, C2, R> {
        Pipeline {
            source: self.source,
            classifier,
            reducer: self.reducer,
            analyzer: self.analyzer,
            policy: self.policy,
        }
    }

    /// Replace the reduction stage
    pub fn with_reducer<R2: Reduce>(self, reducer: R2) -> Pipeline<S, C, R2> {
        Pipeline {
            source: self.source,
            classifier: self.classifier,
            reducer,
            analyzer: self.analyzer,
            policy: self.policy,
        }
    }

    /// Validation policy applied to every run
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// The commit source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: CommitSource, C: Classify, R: Reduce> Pipeline<S, C, R> {
    /// Summarize one branch
    ///
    /// # Errors
    ///
    /// See [`summarize_at`](Self::summarize_at).
    pub fn summarize(&self, options: &WalkOptions) -> Result<HistoryReport, PipelineError> {
        self.summarize_at(options, Utc::now())
    }

    /// Summarize one branch, resolving relative time bounds against `now`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Extraction` for repository or argument errors,
    /// `PipelineError::NoValidCommits` if nothing survives validation, and
    /// `PipelineError::SchemaViolation` for malformed stage output under the
    /// `raise` policy.
    pub fn summarize_at(
        &self,
        options: &WalkOptions,
        now: DateTime<Utc>,
    ) -> Result<HistoryReport, PipelineError> {
        info!(branch = ?options.branch, policy = %self.policy, "Summarizing history");
        let mut gate = ValidationGate::new(self.policy);

        let commits = self
            .source
            .list_commits(options, now)
            .map_err(|e| gate.reject_extraction(e))?;
        debug!(count = commits.len(), "Extracted commits");

        let commits = gate.admit_commits(commits)?;
        let classified = gate.admit_classified(self.classifier.classify(commits))?;
        let report = gate.admit_reduced(self.reducer.reduce(classified))?;

        info!(
            records = report.metadata().records_kept,
            partial = report.is_partial(),
            warnings = gate.report().warnings.len(),
            "History summary complete"
        );
        Ok(report)
    }

    /// Compare two branches
    ///
    /// # Errors
    ///
    /// See [`compare_at`](Self::compare_at).
    pub fn compare(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
    ) -> Result<DivergenceResult, PipelineError> {
        self.compare_at(base, compare, options, Utc::now())
    }

    /// Compare two branches, resolving relative time bounds against `now`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Extraction` for missing branches, unrelated
    /// histories or bad time bounds, and `PipelineError::InvalidComparison`
    /// if the merge base is malformed. Both are fatal under either policy.
    pub fn compare_at(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
        now: DateTime<Utc>,
    ) -> Result<DivergenceResult, PipelineError> {
        info!(base = %base, compare = %compare, policy = %self.policy, "Comparing branches");
        let mut gate = ValidationGate::new(self.policy);

        let comparison = self
            .source
            .compare_branches(base, compare, options, now)
            .map_err(|e| gate.reject_extraction(e))?;
        let comparison = gate.admit_comparison(comparison)?;
        let result = self
            .analyzer
            .analyze(comparison, now)
            .map_err(|defect| gate.reject_comparison(defect))?;
        let result = gate.finish_comparison(result);

        info!(
            base_commits = result.divergence_metrics.base_commit_count,
            compare_commits = result.divergence_metrics.compare_commit_count,
            "Branch comparison complete"
        );
        Ok(result)
    }
}
