// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for storyline-git

use thiserror::Error;

/// Errors that can occur while extracting history from a repository
#[derive(Debug, Error)]
pub enum GitError {
    /// Error from git2 library
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// The path is not (and is not inside) a git repository
    #[error("Not a valid Git repository: {path}")]
    NotAValidRepository {
        /// The path that was searched for a repository
        path: String,
    },

    /// A branch or revision named by the caller does not exist
    #[error("Branch not found: {branch}")]
    BranchNotFound {
        /// The branch name that could not be resolved
        branch: String,
    },

    /// The two compared branches share no history
    #[error("No common ancestor found between {base} and {compare}")]
    NoCommonAncestor {
        /// Base branch of the comparison
        base: String,
        /// Compare branch of the comparison
        compare: String,
    },

    /// A time bound is neither an absolute timestamp nor a relative duration
    #[error("Invalid time format: {spec}")]
    InvalidTimeSpec {
        /// The time argument as given by the caller
        spec: String,
    },

    /// Invalid commit reference (detached or unborn HEAD)
    #[error("Invalid commit reference: {reference}")]
    InvalidReference {
        /// The reference string that could not be resolved
        reference: String,
    },
}
