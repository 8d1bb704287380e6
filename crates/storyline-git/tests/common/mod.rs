// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test utilities for storyline-git integration tests
//!
//! Builds real repositories in a temporary directory with `git2`, so that
//! commit times, authors and branch topology are fully controlled. The
//! storyline-digest and storyline test suites include this module by path.

#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{BranchType, Oid, Repository, Signature, Time, Tree};
use tempfile::TempDir;

/// Default author used by [`FixtureRepo::commit_on`]
pub const AUTHOR: &str = "Test Author";
/// Default author email used by [`FixtureRepo::commit_on`]
pub const EMAIL: &str = "test@example.com";

/// Write `blob` at a possibly nested `path` on top of `base`, returning the new tree
fn write_tree(repo: &Repository, base: Option<&Tree<'_>>, path: &str, blob: Oid) -> Oid {
    let mut builder = repo
        .treebuilder(base)
        .expect("Failed to create tree builder");
    match path.split_once('/') {
        None => {
            builder
                .insert(path, blob, 0o100_644)
                .expect("Failed to insert file");
        }
        Some((dir, rest)) => {
            let subtree = base
                .and_then(|tree| tree.get_name(dir))
                .and_then(|entry| entry.to_object(repo).ok())
                .and_then(|object| object.into_tree().ok());
            let child = write_tree(repo, subtree.as_ref(), rest, blob);
            builder
                .insert(dir, child, 0o040_000)
                .expect("Failed to insert directory");
        }
    }
    builder.write().expect("Failed to write tree")
}

/// A temporary git repository, removed when dropped
pub struct FixtureRepo {
    dir: TempDir,
    repo: Repository,
}

impl FixtureRepo {
    /// Initialise an empty repository
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Repository::init(dir.path()).expect("Failed to init repository");
        Self { dir, repo }
    }

    /// Working directory of the repository
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Underlying git2 handle
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Commit a single file on `branch` as the default author
    ///
    /// The branch is created as a new root if it does not exist yet.
    pub fn commit_on(
        &self,
        branch: &str,
        file: &str,
        content: &str,
        message: &str,
        when: DateTime<Utc>,
    ) -> Oid {
        self.commit_as(branch, file, content, message, when, AUTHOR, EMAIL)
    }

    /// Commit a single file on `branch` as a specific author
    #[allow(clippy::too_many_arguments)]
    pub fn commit_as(
        &self,
        branch: &str,
        file: &str,
        content: &str,
        message: &str,
        when: DateTime<Utc>,
        author: &str,
        email: &str,
    ) -> Oid {
        let parent = self
            .repo
            .find_branch(branch, BranchType::Local)
            .ok()
            .map(|b| b.get().peel_to_commit().expect("Branch should point at a commit"));
        let parent_tree = parent
            .as_ref()
            .map(|p| p.tree().expect("Parent should have a tree"));

        let blob = self
            .repo
            .blob(content.as_bytes())
            .expect("Failed to write blob");
        let tree = self
            .repo
            .find_tree(write_tree(&self.repo, parent_tree.as_ref(), file, blob))
            .expect("Failed to find tree");

        let signature = Signature::new(author, email, &Time::new(when.timestamp(), 0))
            .expect("Failed to create signature");
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(
                Some(&format!("refs/heads/{branch}")),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .expect("Failed to commit")
    }

    /// Create branch `name` pointing at the tip of `from`
    pub fn branch_from(&self, name: &str, from: &str) {
        let tip = self
            .repo
            .find_branch(from, BranchType::Local)
            .expect("Source branch should exist")
            .get()
            .peel_to_commit()
            .expect("Source branch should point at a commit");
        self.repo
            .branch(name, &tip, false)
            .expect("Failed to create branch");
    }

    /// Point HEAD at `branch`
    pub fn set_head(&self, branch: &str) {
        self.repo
            .set_head(&format!("refs/heads/{branch}"))
            .expect("Failed to set HEAD");
    }

    /// Detach HEAD at `oid`
    pub fn detach_head(&self, oid: Oid) {
        self.repo
            .set_head_detached(oid)
            .expect("Failed to detach HEAD");
    }

    /// Blob id of `file` in the tree of `commit`
    pub fn blob_id(&self, commit: Oid, file: &str) -> Oid {
        self.repo
            .find_commit(commit)
            .expect("Commit should exist")
            .tree()
            .expect("Commit should have a tree")
            .get_path(Path::new(file))
            .expect("File should be in the tree")
            .id()
    }

    /// Delete a loose object from the object store
    pub fn remove_object(&self, oid: Oid) {
        let hex = oid.to_string();
        let object = self
            .repo
            .path()
            .join("objects")
            .join(&hex[..2])
            .join(&hex[2..]);
        std::fs::remove_file(object).expect("Failed to remove loose object");
    }
}
