// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Two-branch divergence analysis
//!
//! Turns a [`BranchComparison`] into per-side statistics, divergence metrics,
//! a file-overlap analysis and a plain-text comparison digest. Files touched
//! on both sides are the conflict-risk indicator for a prospective merge.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyline_git::{BranchComparison, CommitRecord};
use tracing::debug;

use crate::classify::{CommitClassifier, Stats, classify_message};
use crate::reduce::{CommitDigest, MAX_COMMITS_PER_CATEGORY};
use crate::validation::{CommitDefect, ValidationReport, validate_commit};

/// Unique commits listed per side in the comparison digest
pub const COMPARISON_LINES_PER_SIDE: usize = 5;
/// Shared-context commits listed in the comparison digest
pub const CONTEXT_LINES: usize = 10;
/// Shared files listed in the comparison digest
pub const SHARED_FILES_SHOWN: usize = 10;
/// Message length in comparison one-liners
pub const COMPARISON_MESSAGE_LENGTH: usize = 80;

/// Render the time between `since` and `now` in its coarsest unit
///
/// More than 30 days is counted in 30-day months, otherwise whole days,
/// otherwise hours; anything under an hour is "recently".
#[must_use]
pub fn humanize_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - since;
    let days = elapsed.num_days();
    let hours = elapsed.num_hours();

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    if days > 30 {
        plural(days / 30, "month")
    } else if days > 0 {
        plural(days, "day")
    } else if hours >= 1 {
        plural(hours, "hour")
    } else {
        "recently".to_string()
    }
}

/// Size and age of a divergence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceMetrics {
    /// Time since the merge base, e.g. "3 days ago"
    pub time_since_divergence: String,
    /// Commits unique to the base branch
    pub base_commit_count: usize,
    /// Commits unique to the compare branch
    pub compare_commit_count: usize,
    /// Display names of the base side's contributors, one per author identity
    pub base_contributors: Vec<String>,
    /// Display names of the compare side's contributors, one per author identity
    pub compare_contributors: Vec<String>,
}

/// Files touched on each side of a divergence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOverlap {
    /// Files changed only on the base side
    pub base_only_files: Vec<String>,
    /// Files changed only on the compare side
    pub compare_only_files: Vec<String>,
    /// Files changed on both sides (potential conflicts)
    pub shared_files: Vec<String>,
}

impl FileOverlap {
    /// Compare the union of files touched by each side
    #[must_use]
    pub fn between(base: &[CommitRecord], compare: &[CommitRecord]) -> Self {
        let touched = |commits: &[CommitRecord]| -> BTreeSet<String> {
            commits
                .iter()
                .flat_map(|c| c.files_changed.iter().cloned())
                .collect()
        };
        let base_files = touched(base);
        let compare_files = touched(compare);

        Self {
            base_only_files: base_files.difference(&compare_files).cloned().collect(),
            compare_only_files: compare_files.difference(&base_files).cloned().collect(),
            shared_files: base_files.intersection(&compare_files).cloned().collect(),
        }
    }
}

/// Comparison summary for two branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceResult {
    /// Base branch name
    pub base_branch: String,
    /// Compare branch name
    pub compare_branch: String,
    /// The point of divergence
    pub merge_base: CommitDigest,
    /// Reduced commits unique to base (capped)
    pub base_only: Vec<CommitDigest>,
    /// Reduced commits unique to compare (capped)
    pub compare_only: Vec<CommitDigest>,
    /// Reduced commits reachable from the merge base
    pub context: Vec<CommitDigest>,
    /// Divergence size and age
    pub divergence_metrics: DivergenceMetrics,
    /// Classification statistics for base's unique commits
    pub base_stats: Stats,
    /// Classification statistics for compare's unique commits
    pub compare_stats: Stats,
    /// File overlap between the sides
    pub file_overlap: FileOverlap,
    /// Human-readable comparison digest
    pub digest: String,
    /// Validation diagnostics for the run, attached by the gate
    pub validation_report: Option<ValidationReport>,
}

/// Builds a [`DivergenceResult`] from comparison topology
#[derive(Debug, Clone, Copy, Default)]
pub struct DivergenceAnalyzer {
    classifier: CommitClassifier,
}

impl DivergenceAnalyzer {
    /// Create an analyzer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze a comparison as of `now`
    ///
    /// # Errors
    ///
    /// Returns the merge base's defect if it is missing a required field or
    /// its timestamp does not parse.
    pub fn analyze(
        &self,
        comparison: BranchComparison,
        now: DateTime<Utc>,
    ) -> Result<DivergenceResult, CommitDefect> {
        validate_commit(&comparison.merge_base)?;
        let diverged_at = comparison
            .merge_base
            .parsed_timestamp()
            .ok_or_else(|| CommitDefect::InvalidTimestamp(comparison.merge_base.timestamp.clone()))?;

        let base_stats = self.classifier.stats(&comparison.base_only);
        let compare_stats = self.classifier.stats(&comparison.compare_only);
        let file_overlap = FileOverlap::between(&comparison.base_only, &comparison.compare_only);

        let divergence_metrics = DivergenceMetrics {
            time_since_divergence: humanize_elapsed(diverged_at, now),
            base_commit_count: comparison.base_only.len(),
            compare_commit_count: comparison.compare_only.len(),
            base_contributors: contributors(&base_stats),
            compare_contributors: contributors(&compare_stats),
        };

        let merge_base = reduce_one(&comparison.merge_base);
        let base_only = reduce_side(&comparison.base_only);
        let compare_only = reduce_side(&comparison.compare_only);
        let context: Vec<_> = comparison.context.iter().map(reduce_one).collect();

        debug!(
            base = %comparison.base_branch,
            compare = %comparison.compare_branch,
            shared_files = file_overlap.shared_files.len(),
            "Analyzed divergence"
        );

        let mut result = DivergenceResult {
            base_branch: comparison.base_branch,
            compare_branch: comparison.compare_branch,
            merge_base,
            base_only,
            compare_only,
            context,
            divergence_metrics,
            base_stats,
            compare_stats,
            file_overlap,
            digest: String::new(),
            validation_report: None,
        };
        result.digest = render_digest(&result);
        Ok(result)
    }
}

/// One display name per author identity
fn contributors(stats: &Stats) -> Vec<String> {
    let mut names: Vec<String> = stats.by_author.values().map(|a| a.name.clone()).collect();
    names.sort_unstable();
    names
}

fn reduce_one(commit: &CommitRecord) -> CommitDigest {
    CommitDigest::from_commit(commit, classify_message(&commit.message).as_str())
}

fn reduce_side(commits: &[CommitRecord]) -> Vec<CommitDigest> {
    commits
        .iter()
        .take(MAX_COMMITS_PER_CATEGORY)
        .map(reduce_one)
        .collect()
}

fn render_digest(result: &DivergenceResult) -> String {
    let base = &result.base_branch;
    let compare = &result.compare_branch;
    let metrics = &result.divergence_metrics;
    let overlap = &result.file_overlap;

    let mut sections = vec![
        format!("# BRANCH COMPARISON: {base} vs {compare}"),
        [
            "## DIVERGENCE SUMMARY".to_string(),
            format!(
                "Merge base: {}",
                result
                    .merge_base
                    .one_liner(COMPARISON_MESSAGE_LENGTH)
                    .trim_start_matches("- ")
            ),
            format!("Diverged: {}", metrics.time_since_divergence),
            format!(
                "{base}: {} unique commits by {} contributors",
                metrics.base_commit_count,
                metrics.base_contributors.len()
            ),
            format!(
                "{compare}: {} unique commits by {} contributors",
                metrics.compare_commit_count,
                metrics.compare_contributors.len()
            ),
        ]
        .join("\n"),
    ];

    let mut distribution = vec!["## COMMIT TYPE DISTRIBUTION".to_string()];
    for (name, stats) in [(base, &result.base_stats), (compare, &result.compare_stats)] {
        distribution.push(format!("### {name}"));
        distribution.extend(type_distribution(stats));
    }
    sections.push(distribution.join("\n"));

    let mut files = vec![
        "## FILE CHANGE ANALYSIS".to_string(),
        format!(
            "Files changed only in {base}: {}",
            overlap.base_only_files.len()
        ),
        format!(
            "Files changed only in {compare}: {}",
            overlap.compare_only_files.len()
        ),
        format!(
            "Files changed in both (potential conflicts): {}",
            overlap.shared_files.len()
        ),
    ];
    if overlap.shared_files.is_empty() {
        files.push("Shared files: None".to_string());
    } else {
        files.push("Shared files:".to_string());
        files.extend(
            overlap
                .shared_files
                .iter()
                .take(SHARED_FILES_SHOWN)
                .map(|f| format!("  - {f}")),
        );
    }
    sections.push(files.join("\n"));

    for (name, commits) in [(base, &result.base_only), (compare, &result.compare_only)] {
        let mut block = vec![format!("## UNIQUE COMMITS - {}", name.to_uppercase())];
        if commits.is_empty() {
            block.push("No unique commits".to_string());
        } else {
            block.push(format!("### OTHER ({} commits)", commits.len()));
            block.extend(listing(commits, COMPARISON_LINES_PER_SIDE));
        }
        sections.push(block.join("\n"));
    }

    let mut context = vec!["## SHARED CONTEXT".to_string()];
    context.extend(listing(&result.context, CONTEXT_LINES));
    sections.push(context.join("\n"));

    sections.join("\n\n")
}

fn type_distribution(stats: &Stats) -> Vec<String> {
    if stats.total_commits == 0 {
        return vec!["No commits".to_string()];
    }
    stats
        .ranked_types()
        .into_iter()
        .map(|(category, count)| {
            #[allow(clippy::cast_precision_loss)]
            let pct = count as f64 * 100.0 / stats.total_commits as f64;
            format!("- {category}: {count} ({pct:.1}%)")
        })
        .collect()
}

fn listing(commits: &[CommitDigest], max: usize) -> Vec<String> {
    let mut lines: Vec<String> = commits
        .iter()
        .take(max)
        .map(|c| c.one_liner(COMPARISON_MESSAGE_LENGTH))
        .collect();
    if commits.len() > max {
        lines.push(format!("... and {} more", commits.len() - max));
    }
    lines
}
