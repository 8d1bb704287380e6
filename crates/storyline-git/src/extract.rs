// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! History extraction
//!
//! This module walks a repository's commit log with `git2` and turns each
//! commit into a [`CommitRecord`], including its changed files, line counts
//! and diff text. It also resolves the topology needed to compare two
//! branches (merge base, commits unique to each side, shared context).

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use git2::{
    BranchType, Diff, DiffFormat, DiffOptions, ErrorCode, ObjectType, Oid, Repository, Sort, Tree,
    TreeWalkMode, TreeWalkResult,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::commit::CommitRecord;
use crate::error::GitError;
use crate::timespec::TimeWindow;

/// Default number of shared-context commits taken from the merge base
pub const DEFAULT_CONTEXT_SIZE: usize = 5;

/// Configuration for listing the commits of one branch
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Branch (or any revision) to walk; defaults to the current branch
    pub branch: Option<String>,
    /// Only include commits at or after this time (absolute or relative)
    pub since: Option<String>,
    /// Only include commits at or before this time (absolute or relative)
    pub until: Option<String>,
}

impl WalkOptions {
    /// Walk the given branch instead of the current one
    #[must_use]
    pub fn on_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Filter commits since a time spec
    #[must_use]
    pub fn since(mut self, spec: &str) -> Self {
        self.since = Some(spec.to_string());
        self
    }

    /// Filter commits until a time spec
    #[must_use]
    pub fn until(mut self, spec: &str) -> Self {
        self.until = Some(spec.to_string());
        self
    }
}

/// Configuration for comparing two branches
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Only include unique commits at or after this time
    pub since: Option<String>,
    /// Only include unique commits at or before this time
    pub until: Option<String>,
    /// Number of commits reachable from the merge base to include as context
    pub context_size: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            since: None,
            until: None,
            context_size: DEFAULT_CONTEXT_SIZE,
        }
    }
}

impl CompareOptions {
    /// Filter unique commits since a time spec
    #[must_use]
    pub fn since(mut self, spec: &str) -> Self {
        self.since = Some(spec.to_string());
        self
    }

    /// Filter unique commits until a time spec
    #[must_use]
    pub fn until(mut self, spec: &str) -> Self {
        self.until = Some(spec.to_string());
        self
    }

    /// Set the shared-context window size
    #[must_use]
    pub fn with_context(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }
}

/// Raw topology data for a two-branch comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchComparison {
    /// Name of the base branch
    pub base_branch: String,
    /// Name of the compare branch
    pub compare_branch: String,
    /// The most recent commit reachable from both branches
    pub merge_base: CommitRecord,
    /// Commits reachable from base but not from compare (`compare..base`)
    pub base_only: Vec<CommitRecord>,
    /// Commits reachable from compare but not from base (`base..compare`)
    pub compare_only: Vec<CommitRecord>,
    /// Most recent commits reachable from the merge base itself
    pub context: Vec<CommitRecord>,
}

/// Files, line counts and diff text of one commit
struct Changes {
    files: Vec<String>,
    insertions: usize,
    deletions: usize,
    diff: String,
}

impl Changes {
    fn unavailable(err: &git2::Error) -> Self {
        Self {
            files: Vec::new(),
            insertions: 0,
            deletions: 0,
            diff: diff_placeholder(err),
        }
    }
}

/// Reads commit history and branch topology from a git repository
pub struct HistoryExtractor {
    repo: Repository,
}

impl HistoryExtractor {
    /// Discover and open the repository containing `path`
    ///
    /// This walks up the directory tree the same way `git` does.
    ///
    /// # Errors
    ///
    /// Returns `GitError::NotAValidRepository` if no repository is found.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|_| GitError::NotAValidRepository {
            path: path.display().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// Get the repository's `.git` path
    #[must_use]
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    /// List commits on a branch, newest first, within the options' time window
    ///
    /// # Errors
    ///
    /// Returns `GitError` if a time bound is invalid, the branch cannot be
    /// resolved, or the log cannot be walked.
    pub fn list_commits(&self, options: &WalkOptions) -> Result<Vec<CommitRecord>, GitError> {
        self.list_commits_at(options, Utc::now())
    }

    /// Like [`list_commits`](Self::list_commits), resolving relative time
    /// bounds against `now`
    ///
    /// # Errors
    ///
    /// See [`list_commits`](Self::list_commits).
    pub fn list_commits_at(
        &self,
        options: &WalkOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let window = TimeWindow::resolve(options.since.as_deref(), options.until.as_deref(), now)?;
        let branch = match options.branch {
            Some(ref branch) => branch.clone(),
            None => self.current_branch()?,
        };

        let tip = self
            .repo
            .revparse_single(&branch)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| GitError::BranchNotFound {
                branch: branch.clone(),
            })?
            .id();

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(tip)?;

        let mut records = Vec::new();
        for oid_result in revwalk {
            let git_commit = self.repo.find_commit(oid_result?)?;
            let committed = commit_time(&git_commit);

            // The walk is newest-first, so nothing older can follow.
            if window.is_before_start(committed) {
                debug!(hash = %git_commit.id(), "Reached start of time window, stopping");
                break;
            }
            if window.is_after_end(committed) {
                continue;
            }

            records.push(self.record_from_commit(&git_commit, committed));
        }

        debug!(branch = %branch, count = records.len(), "Listed commits");
        Ok(records)
    }

    /// List local branch names
    ///
    /// # Errors
    ///
    /// Returns `GitError` if the branch list cannot be read.
    pub fn list_branches(&self) -> Result<Vec<String>, GitError> {
        let mut names = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Get the name of the branch HEAD points at
    ///
    /// # Errors
    ///
    /// Returns `GitError::InvalidReference` if HEAD is detached, or
    /// `GitError::Git2` if HEAD cannot be read (e.g. an empty repository).
    pub fn current_branch(&self) -> Result<String, GitError> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(GitError::InvalidReference {
                reference: "HEAD".to_string(),
            });
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| GitError::InvalidReference {
                reference: "HEAD".to_string(),
            })
    }

    /// Compare two local branches
    ///
    /// # Errors
    ///
    /// Returns `GitError::BranchNotFound` if either branch is missing,
    /// `GitError::NoCommonAncestor` if the histories are unrelated, or
    /// `GitError::InvalidTimeSpec` for a bad time bound.
    pub fn compare_branches(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
    ) -> Result<BranchComparison, GitError> {
        self.compare_branches_at(base, compare, options, Utc::now())
    }

    /// Like [`compare_branches`](Self::compare_branches), resolving relative
    /// time bounds against `now`
    ///
    /// # Errors
    ///
    /// See [`compare_branches`](Self::compare_branches).
    pub fn compare_branches_at(
        &self,
        base: &str,
        compare: &str,
        options: &CompareOptions,
        now: DateTime<Utc>,
    ) -> Result<BranchComparison, GitError> {
        let branches = self.list_branches()?;
        for name in [base, compare] {
            if !branches.iter().any(|b| b == name) {
                return Err(GitError::BranchNotFound {
                    branch: name.to_string(),
                });
            }
        }

        let window = TimeWindow::resolve(options.since.as_deref(), options.until.as_deref(), now)?;
        let base_tip = self.branch_tip(base)?;
        let compare_tip = self.branch_tip(compare)?;

        let merge_base_oid = match self.repo.merge_base(base_tip, compare_tip) {
            Ok(oid) => oid,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(GitError::NoCommonAncestor {
                    base: base.to_string(),
                    compare: compare.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let merge_base_commit = self.repo.find_commit(merge_base_oid)?;
        let merge_base =
            self.record_from_commit(&merge_base_commit, commit_time(&merge_base_commit));

        let base_only = self.commits_in_range(base_tip, compare_tip, &window)?;
        let compare_only = self.commits_in_range(compare_tip, base_tip, &window)?;
        let context = self.commits_from(merge_base_oid, options.context_size)?;

        debug!(
            base = %base,
            compare = %compare,
            merge_base = %merge_base.hash,
            base_only = base_only.len(),
            compare_only = compare_only.len(),
            "Compared branches"
        );

        Ok(BranchComparison {
            base_branch: base.to_string(),
            compare_branch: compare.to_string(),
            merge_base,
            base_only,
            compare_only,
            context,
        })
    }

    fn branch_tip(&self, name: &str) -> Result<Oid, GitError> {
        let branch = self.repo.find_branch(name, BranchType::Local)?;
        Ok(branch.get().peel_to_commit()?.id())
    }

    /// Commits reachable from `include` but not from `exclude`, time-filtered
    ///
    /// Unlike a plain walk this does not stop early: range walks are not
    /// guaranteed to be contiguous in time.
    fn commits_in_range(
        &self,
        include: Oid,
        exclude: Oid,
        window: &TimeWindow,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(include)?;
        revwalk.hide(exclude)?;

        let mut records = Vec::new();
        for oid_result in revwalk {
            let git_commit = self.repo.find_commit(oid_result?)?;
            let committed = commit_time(&git_commit);
            if window.contains(committed) {
                records.push(self.record_from_commit(&git_commit, committed));
            }
        }
        Ok(records)
    }

    /// The `max_count` most recent commits reachable from `start`
    fn commits_from(&self, start: Oid, max_count: usize) -> Result<Vec<CommitRecord>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(start)?;

        let mut records = Vec::new();
        for oid_result in revwalk.take(max_count) {
            let git_commit = self.repo.find_commit(oid_result?)?;
            records.push(self.record_from_commit(&git_commit, commit_time(&git_commit)));
        }
        Ok(records)
    }

    /// Build a record from a git2 commit
    ///
    /// Diff failures are recovered here: the commit is kept and whatever
    /// could not be read is replaced, the diff text by the error message.
    fn record_from_commit(
        &self,
        git_commit: &git2::Commit<'_>,
        timestamp: DateTime<Utc>,
    ) -> CommitRecord {
        let sha = git_commit.id().to_string();
        let hash = CommitRecord::short_hash(&sha).to_string();
        let changes = self.extract_changes(git_commit, &hash);

        let author = git_commit.author();
        CommitRecord {
            hash,
            author: author.name().unwrap_or("Unknown").to_string(),
            email: author.email().unwrap_or("").to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            message: String::from_utf8_lossy(git_commit.message_bytes())
                .trim()
                .to_string(),
            files_changed: changes.files,
            insertions: changes.insertions,
            deletions: changes.deletions,
            diff: changes.diff,
        }
    }

    /// Extract changed files, line counts and diff text for a commit
    ///
    /// The file list only needs the trees. Line counts and diff text read
    /// blob contents, so each of them fails on its own.
    fn extract_changes(&self, git_commit: &git2::Commit<'_>, hash: &str) -> Changes {
        let (diff, tree, is_root) = match self.tree_diff(git_commit) {
            Ok(parts) => parts,
            Err(err) => {
                warn!(hash = %hash, error = %err, "Diff extraction failed, keeping commit");
                return Changes::unavailable(&err);
            }
        };

        let files = diff
            .deltas()
            .map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string())
            })
            .collect();

        let (insertions, deletions) = match diff.stats() {
            Ok(stats) => (stats.insertions(), stats.deletions()),
            Err(err) => {
                warn!(hash = %hash, error = %err, "Line counts unavailable");
                (0, 0)
            }
        };

        let text = if is_root {
            initial_commit_listing(&tree)
        } else {
            patch_text(&diff)
        };
        let diff_text = text.unwrap_or_else(|err| {
            warn!(hash = %hash, error = %err, "Diff extraction failed, keeping commit");
            diff_placeholder(&err)
        });

        Changes {
            files,
            insertions,
            deletions,
            diff: diff_text,
        }
    }

    /// Diff of a commit against its first parent, or against nothing for a root
    fn tree_diff<'r, 'c>(
        &'r self,
        git_commit: &git2::Commit<'c>,
    ) -> Result<(Diff<'r>, Tree<'c>, bool), git2::Error> {
        let tree = git_commit.tree()?;
        let parent_tree = if git_commit.parent_count() > 0 {
            Some(git_commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.ignore_whitespace(false);

        let diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
        Ok((diff, tree, parent_tree.is_none()))
    }
}

/// Commit time of a git2 commit, in UTC
fn commit_time(git_commit: &git2::Commit<'_>) -> DateTime<Utc> {
    Utc.timestamp_opt(git_commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Diff text recorded when a commit's changes cannot be read
fn diff_placeholder(err: &git2::Error) -> String {
    format!("Error extracting diff: {}", err.message())
}

/// Render a diff as unified patch text
fn patch_text(diff: &Diff<'_>) -> Result<String, git2::Error> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin());
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(text)
}

/// "All files added" listing for a commit without a parent
fn initial_commit_listing(tree: &Tree<'_>) -> Result<String, git2::Error> {
    let mut lines = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            lines.push(format!("A {}{}", root, entry.name().unwrap_or("<non-utf8>")));
        }
        TreeWalkResult::Ok
    })?;
    Ok(lines.join("\n"))
}
