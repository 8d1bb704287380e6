// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Commit classification
//!
//! Each commit message is matched against an ordered table of
//! `(category, patterns)` pairs. The first category with a matching pattern
//! wins, so table order encodes precedence: a message such as
//! `"add login tests"` is a feature, not a test, because feature patterns are
//! tried first. Patterns are case-insensitive and `^` anchors to the very
//! start of the message, so leading whitespace defeats anchored patterns.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use storyline_git::CommitRecord;

use crate::category::Category;

static PATTERNS: LazyLock<Vec<(Category, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            Category::Feature,
            compile(&[
                r"^feat(\(.+\))?:",
                r"^add",
                r"^implement",
                r"new feature",
                r"feature:",
            ]),
        ),
        (
            Category::Bugfix,
            compile(&[
                r"^fix(\(.+\))?:",
                r"^bug",
                r"hotfix",
                r"patch",
                r"resolve.*issue",
            ]),
        ),
        (
            Category::Refactor,
            compile(&[
                r"^refactor(\(.+\))?:",
                r"refactor",
                r"restructure",
                r"reorganize",
            ]),
        ),
        (
            Category::Docs,
            compile(&[r"^docs?(\(.+\))?:", r"documentation", r"readme", r"comment"]),
        ),
        (
            Category::Style,
            compile(&[r"^style(\(.+\))?:", r"formatting", r"whitespace", r"lint"]),
        ),
        (
            Category::Test,
            compile(&[r"^test(\(.+\))?:", r"add.*test", r"test.*coverage"]),
        ),
        (
            Category::Chore,
            compile(&[
                r"^chore(\(.+\))?:",
                r"dependency",
                r"dependencies",
                r"package",
                r"build",
            ]),
        ),
    ]
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("classification pattern is valid")
        })
        .collect()
}

/// Assign a category to a single commit message
///
/// Pure function of the message text.
#[must_use]
pub fn classify_message(message: &str) -> Category {
    PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(message)))
        .map_or(Category::Other, |(category, _)| *category)
}

/// Per-author commit summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    /// Longest display name seen for this identity
    pub name: String,
    /// Number of commits
    pub count: usize,
    /// Commits per category
    pub by_type: BTreeMap<Category, usize>,
}

/// Aggregate statistics over a set of commits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of commits classified
    pub total_commits: usize,
    /// Commits per category; only categories with at least one commit
    pub by_type: BTreeMap<Category, usize>,
    /// Per-author summaries keyed by identity (email, or name without one)
    pub by_author: BTreeMap<String, AuthorSummary>,
}

impl Stats {
    /// Fold one classified commit into the totals
    pub fn record(&mut self, commit: &CommitRecord, category: Category) {
        self.total_commits += 1;
        *self.by_type.entry(category).or_default() += 1;

        let author = self
            .by_author
            .entry(commit.identity().to_string())
            .or_insert_with(|| AuthorSummary {
                name: commit.author.clone(),
                ..Default::default()
            });
        if commit.author.chars().count() > author.name.chars().count() {
            author.name.clone_from(&commit.author);
        }
        author.count += 1;
        *author.by_type.entry(category).or_default() += 1;
    }

    /// Categories ordered by descending count, ties in priority order
    #[must_use]
    pub fn ranked_types(&self) -> Vec<(Category, usize)> {
        let mut ranked: Vec<_> = self.by_type.iter().map(|(c, n)| (*c, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// A labelled group of commits, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Category name, or a commit hash for degraded per-commit grouping
    pub label: String,
    /// Commits in this group
    pub commits: Vec<CommitRecord>,
}

/// Output of the classification stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSet {
    /// Commit groups, one per category in priority order
    pub buckets: Vec<Bucket>,
    /// Aggregate statistics; `None` if the classifier did not produce them
    pub stats: Option<Stats>,
}

impl ClassifiedSet {
    /// Degraded grouping where every commit is its own bucket keyed by hash
    ///
    /// Carries no statistics.
    #[must_use]
    pub fn per_commit(commits: Vec<CommitRecord>) -> Self {
        let buckets = commits
            .into_iter()
            .map(|commit| Bucket {
                label: commit.hash.clone(),
                commits: vec![commit],
            })
            .collect();
        Self {
            buckets,
            stats: None,
        }
    }

    /// Find a bucket by label
    #[must_use]
    pub fn bucket(&self, label: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.label == label)
    }

    /// Total number of commits across all buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.commits.len()).sum()
    }

    /// True if no bucket holds a commit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The classification stage
pub trait Classify {
    /// Group commits by category and compute statistics
    fn classify(&self, commits: Vec<CommitRecord>) -> ClassifiedSet;
}

/// Pattern-table classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitClassifier;

impl CommitClassifier {
    /// Create a classifier
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute statistics for a commit list without bucketing it
    #[must_use]
    pub fn stats(&self, commits: &[CommitRecord]) -> Stats {
        commits.iter().fold(Stats::default(), |mut stats, commit| {
            stats.record(commit, classify_message(&commit.message));
            stats
        })
    }
}

impl Classify for CommitClassifier {
    fn classify(&self, commits: Vec<CommitRecord>) -> ClassifiedSet {
        let mut stats = Stats::default();
        let mut grouped: BTreeMap<Category, Vec<CommitRecord>> = BTreeMap::new();

        for commit in commits {
            let category = classify_message(&commit.message);
            stats.record(&commit, category);
            grouped.entry(category).or_default().push(commit);
        }

        let buckets = Category::ALL
            .into_iter()
            .map(|category| Bucket {
                label: category.to_string(),
                commits: grouped.remove(&category).unwrap_or_default(),
            })
            .collect();

        ClassifiedSet {
            buckets,
            stats: Some(stats),
        }
    }
}
