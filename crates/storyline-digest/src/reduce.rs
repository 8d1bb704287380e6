// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Size-bounded reduction of classified history
//!
//! The reducer caps every category, truncates messages, splits diffs into
//! fixed-size chunks and renders a plain-text digest grouped by category.
//! Limits are fixed policy constants. Caps are applied in arrival order,
//! which for extracted history is newest first.

use serde::{Deserialize, Serialize};
use storyline_git::CommitRecord;

use crate::classify::{ClassifiedSet, Stats};
use crate::validation::ValidationReport;

/// Maximum message length kept in a commit digest
pub const MAX_MESSAGE_LENGTH: usize = 200;
/// Maximum commits kept per category
pub const MAX_COMMITS_PER_CATEGORY: usize = 50;
/// Characters per diff chunk
pub const DIFF_CHUNK_SIZE: usize = 2000;
/// One-liners shown per category in the digest text
pub const DIGEST_LINES_PER_CATEGORY: usize = 10;
/// Message length in digest one-liners
pub const DIGEST_MESSAGE_LENGTH: usize = 100;

/// Digest text used when the reduction output had to be discarded
pub const PARTIAL_DIGEST_PLACEHOLDER: &str = "Partial summary (reduction validation failed)";

/// Truncate to `max` characters, appending `...` when anything was cut
#[must_use]
pub fn truncate_message(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

/// First `max` characters of `message`, without any marker
#[must_use]
pub fn clip_message(message: &str, max: usize) -> &str {
    message
        .char_indices()
        .nth(max)
        .map_or(message, |(idx, _)| &message[..idx])
}

/// Split a diff into chunks of at most `size` characters
///
/// Concatenating the chunks gives back the input. An empty diff has no
/// chunks, and there is never an empty trailing chunk.
#[must_use]
pub fn chunk_diff(diff: &str, size: usize) -> Vec<String> {
    if size == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut rest = diff;
    while !rest.is_empty() {
        let split = rest.char_indices().nth(size).map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    chunks
}

/// Reduced form of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDigest {
    /// Short commit hash
    pub hash: String,
    /// Author display name
    pub author: String,
    /// Commit time, as extracted
    pub timestamp: String,
    /// Message truncated to [`MAX_MESSAGE_LENGTH`]
    pub message: String,
    /// Label of the group the commit was reduced under
    pub category: String,
    /// Number of files touched
    pub files_changed: usize,
    /// Insertions plus deletions
    pub changes: usize,
    /// Diff split into [`DIFF_CHUNK_SIZE`] pieces
    pub diff_chunks: Vec<String>,
}

impl CommitDigest {
    /// Reduce one commit filed under `label`
    #[must_use]
    pub fn from_commit(commit: &CommitRecord, label: &str) -> Self {
        Self {
            hash: commit.hash.clone(),
            author: commit.author.clone(),
            timestamp: commit.timestamp.clone(),
            message: truncate_message(&commit.message, MAX_MESSAGE_LENGTH),
            category: label.to_string(),
            files_changed: commit.files_changed.len(),
            changes: commit.line_delta(),
            diff_chunks: chunk_diff(&commit.diff, DIFF_CHUNK_SIZE),
        }
    }

    /// `- [hash] author: message` with the message's first line clipped to `max`
    /// characters
    #[must_use]
    pub fn one_liner(&self, max: usize) -> String {
        let subject = self.message.lines().next().unwrap_or("");
        format!(
            "- [{}] {}: {}",
            self.hash,
            self.author,
            clip_message(subject, max)
        )
    }
}

/// Processing details for a reduced report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Commits present in the report
    pub records_kept: usize,
    /// Commits dropped by the per-category cap
    pub records_discarded: usize,
    /// Labels of groups with at least one kept commit
    pub categories_present: Vec<String>,
    /// Validation diagnostics for the run, attached by the gate
    pub validation_report: Option<ValidationReport>,
}

/// Bounded output of the reduction stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedReport {
    /// Reduced commits, grouped by category in priority order
    pub commits: Vec<CommitDigest>,
    /// Human-readable digest grouped by category
    pub digest: String,
    /// Statistics carried over from classification
    pub stats: Option<Stats>,
    /// Processing details
    pub metadata: ReportMetadata,
}

/// Result of a run whose reduction output failed validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialReport {
    /// Commits that passed per-record validation
    pub commits: Vec<CommitRecord>,
    /// Always [`PARTIAL_DIGEST_PLACEHOLDER`]
    pub digest: String,
    /// Empty statistics
    pub stats: Stats,
    /// Processing details, including the validation report
    pub metadata: ReportMetadata,
}

impl PartialReport {
    /// Build a partial report with the placeholder digest
    #[must_use]
    pub fn new(commits: Vec<CommitRecord>, stats: Stats, metadata: ReportMetadata) -> Self {
        Self {
            commits,
            digest: PARTIAL_DIGEST_PLACEHOLDER.to_string(),
            stats,
            metadata,
        }
    }
}

/// Final output of a single-branch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HistoryReport {
    /// Every stage passed validation
    Complete(ReducedReport),
    /// Reduction was discarded under the fallback policy
    Partial(PartialReport),
}

impl HistoryReport {
    /// Digest text
    #[must_use]
    pub fn digest(&self) -> &str {
        match self {
            HistoryReport::Complete(report) => &report.digest,
            HistoryReport::Partial(report) => &report.digest,
        }
    }

    /// Processing metadata
    #[must_use]
    pub fn metadata(&self) -> &ReportMetadata {
        match self {
            HistoryReport::Complete(report) => &report.metadata,
            HistoryReport::Partial(report) => &report.metadata,
        }
    }

    /// True if the reduction was discarded
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, HistoryReport::Partial(_))
    }
}

/// The reduction stage
pub trait Reduce {
    /// Shrink classified history into a bounded report
    fn reduce(&self, classified: ClassifiedSet) -> ReducedReport;
}

/// Fixed-budget reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct DataReducer;

impl DataReducer {
    /// Create a reducer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Reduce for DataReducer {
    fn reduce(&self, classified: ClassifiedSet) -> ReducedReport {
        let mut commits = Vec::new();
        let mut blocks = Vec::new();
        let mut metadata = ReportMetadata::default();

        for bucket in classified.buckets {
            if bucket.commits.is_empty() {
                continue;
            }
            metadata.records_discarded += bucket
                .commits
                .len()
                .saturating_sub(MAX_COMMITS_PER_CATEGORY);

            let kept: Vec<CommitDigest> = bucket
                .commits
                .iter()
                .take(MAX_COMMITS_PER_CATEGORY)
                .map(|commit| CommitDigest::from_commit(commit, &bucket.label))
                .collect();

            blocks.push(digest_block(&bucket.label, &kept));
            metadata.categories_present.push(bucket.label);
            commits.extend(kept);
        }

        metadata.records_kept = commits.len();
        ReducedReport {
            commits,
            digest: blocks.join("\n\n"),
            stats: classified.stats,
            metadata,
        }
    }
}

fn digest_block(label: &str, commits: &[CommitDigest]) -> String {
    let mut lines = vec![format!(
        "## {} COMMITS ({} total)",
        label.to_uppercase(),
        commits.len()
    )];
    lines.extend(
        commits
            .iter()
            .take(DIGEST_LINES_PER_CATEGORY)
            .map(|c| c.one_liner(DIGEST_MESSAGE_LENGTH)),
    );
    if commits.len() > DIGEST_LINES_PER_CATEGORY {
        lines.push(format!(
            "... and {} more",
            commits.len() - DIGEST_LINES_PER_CATEGORY
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classify, CommitClassifier};
    use similar_asserts::assert_eq;

    fn commit(hash: &str, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            author: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            message: message.to_string(),
            files_changed: vec!["a.rs".to_string(), "b.rs".to_string()],
            insertions: 7,
            deletions: 3,
            diff: "+x\n-y\n".to_string(),
        }
    }

    #[test]
    fn test_truncate_boundaries() {
        let exact = "a".repeat(MAX_MESSAGE_LENGTH);
        assert_eq!(truncate_message(&exact, MAX_MESSAGE_LENGTH), exact);

        let over = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        let truncated = truncate_message(&over, MAX_MESSAGE_LENGTH);
        assert_eq!(truncated.chars().count(), MAX_MESSAGE_LENGTH + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let message = "é".repeat(5);
        assert_eq!(truncate_message(&message, 3), "ééé...");
    }

    #[test]
    fn test_chunk_diff_exact_multiple() {
        let diff = "x".repeat(DIFF_CHUNK_SIZE * 2);
        let chunks = chunk_diff(&diff, DIFF_CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == DIFF_CHUNK_SIZE));
    }

    #[test]
    fn test_chunk_diff_empty_and_remainder() {
        assert!(chunk_diff("", DIFF_CHUNK_SIZE).is_empty());
        let chunks = chunk_diff(&"y".repeat(DIFF_CHUNK_SIZE + 5), DIFF_CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "yyyyy");
    }

    #[test]
    fn test_commit_digest_fields() {
        let digest = CommitDigest::from_commit(&commit("a1", "feat: x"), "feature");
        assert_eq!(digest.files_changed, 2);
        assert_eq!(digest.changes, 10);
        assert_eq!(digest.diff_chunks, vec!["+x\n-y\n".to_string()]);
        assert_eq!(digest.category, "feature");
    }

    #[test]
    fn test_digest_groups_and_skips_empty_categories() {
        let set = CommitClassifier::new().classify(vec![
            commit("a1", "feat: login"),
            commit("b2", "fix: crash"),
            commit("c3", "feat: logout"),
        ]);
        let reduced = DataReducer::new().reduce(set);

        assert_eq!(
            reduced.digest,
            "## FEATURE COMMITS (2 total)\n\
             - [a1] Ann: feat: login\n\
             - [c3] Ann: feat: logout\n\
             \n\
             ## BUGFIX COMMITS (1 total)\n\
             - [b2] Ann: fix: crash"
        );
        assert_eq!(
            reduced.metadata.categories_present,
            vec!["feature".to_string(), "bugfix".to_string()]
        );
        assert_eq!(reduced.metadata.records_kept, 3);
        assert_eq!(reduced.metadata.records_discarded, 0);
        assert!(reduced.metadata.validation_report.is_none());
        assert_eq!(reduced.stats.map(|s| s.total_commits), Some(3));
    }

    #[test]
    fn test_digest_more_line_and_cap() {
        let commits: Vec<_> = (0..60)
            .map(|i| commit(&format!("h{i:02}"), &format!("feat: item {i}")))
            .collect();
        let reduced = DataReducer::new().reduce(CommitClassifier::new().classify(commits));

        assert_eq!(reduced.commits.len(), MAX_COMMITS_PER_CATEGORY);
        assert_eq!(reduced.metadata.records_discarded, 10);
        // Arrival order is preserved: the first 50 survive
        assert_eq!(reduced.commits[0].hash, "h00");
        assert_eq!(reduced.commits[49].hash, "h49");

        let lines: Vec<_> = reduced.digest.lines().collect();
        assert_eq!(lines[0], "## FEATURE COMMITS (50 total)");
        assert_eq!(lines.len(), 1 + DIGEST_LINES_PER_CATEGORY + 1);
        assert_eq!(lines[11], "... and 40 more");
    }

    #[test]
    fn test_digest_one_liner_truncates_subject() {
        let long = format!("feat: {}\n\nbody", "z".repeat(150));
        let reduced =
            DataReducer::new().reduce(CommitClassifier::new().classify(vec![commit("a1", &long)]));
        let line = reduced.digest.lines().nth(1).expect("one-liner");
        assert_eq!(line, format!("- [a1] Ann: feat: {}", "z".repeat(94)));
        assert_eq!(
            line.chars().count(),
            "- [a1] Ann: ".len() + DIGEST_MESSAGE_LENGTH
        );
    }

    #[test]
    fn test_clip_message_has_no_suffix() {
        assert_eq!(clip_message("abcdef", 3), "abc");
        assert_eq!(clip_message("ééé", 5), "ééé");
        assert_eq!(clip_message("ééé", 2), "éé");
        assert_eq!(clip_message("", 4), "");
    }

    #[test]
    fn test_partial_report_placeholder() {
        let partial = PartialReport::new(Vec::new(), Stats::default(), ReportMetadata::default());
        let report = HistoryReport::Partial(partial);
        assert!(report.is_partial());
        assert_eq!(report.digest(), PARTIAL_DIGEST_PLACEHOLDER);
    }

    #[test]
    fn test_history_report_serializes_status() {
        let report = HistoryReport::Complete(ReducedReport::default());
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["status"], "complete");
        assert!(json.get("digest").is_some());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::classify::{Classify, CommitClassifier};
    use proptest::prelude::*;

    proptest! {
        /// Property: truncation never exceeds max + 3 characters and is a no-op within budget
        #[test]
        fn prop_truncate_bounds(message in ".{0,300}") {
            let truncated = truncate_message(&message, MAX_MESSAGE_LENGTH);
            let len = message.chars().count();
            if len <= MAX_MESSAGE_LENGTH {
                prop_assert_eq!(&truncated, &message);
                prop_assert_eq!(truncate_message(&truncated, MAX_MESSAGE_LENGTH), truncated);
            } else {
                prop_assert_eq!(truncated.chars().count(), MAX_MESSAGE_LENGTH + 3);
                prop_assert!(truncated.ends_with("..."));
            }
        }

        /// Property: chunks concatenate back to the diff with the expected count
        #[test]
        fn prop_chunk_roundtrip(diff in ".{0,5000}", size in 1usize..3000) {
            let chunks = chunk_diff(&diff, size);
            let len = diff.chars().count();
            prop_assert_eq!(chunks.concat(), diff);
            prop_assert_eq!(chunks.len(), len.div_ceil(size));
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.chars().count() <= size));
            if let Some(last) = chunks.last() {
                let rem = len % size;
                prop_assert_eq!(last.chars().count(), if rem == 0 { size } else { rem });
            }
        }

        /// Property: each category keeps exactly min(n, cap) commits, the first ones
        #[test]
        fn prop_category_cap(n in 0usize..120) {
            let commits: Vec<CommitRecord> = (0..n)
                .map(|i| CommitRecord {
                    hash: format!("{i:08x}"),
                    author: "A".to_string(),
                    timestamp: "2026-01-10T10:00:00Z".to_string(),
                    message: "fix: bug".to_string(),
                    ..Default::default()
                })
                .collect();
            let reduced = DataReducer::new().reduce(CommitClassifier::new().classify(commits));
            prop_assert_eq!(reduced.commits.len(), n.min(MAX_COMMITS_PER_CATEGORY));
            prop_assert_eq!(reduced.metadata.records_discarded, n.saturating_sub(MAX_COMMITS_PER_CATEGORY));
            for (i, digest) in reduced.commits.iter().enumerate() {
                prop_assert_eq!(&digest.hash, &format!("{i:08x}"));
            }
        }
    }
}
