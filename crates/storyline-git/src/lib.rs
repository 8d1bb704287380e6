// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! storyline-git: commit history extraction for storyline
//!
//! This library crate reads commit metadata, diffs and branch topology from
//! a git repository and hands them to the storyline pipeline as
//! [`CommitRecord`]s.
//!
//! # Example
//!
//! ```no_run
//! use storyline_git::{HistoryExtractor, WalkOptions};
//!
//! let extractor = HistoryExtractor::open(".").expect("open repo");
//! let commits = extractor
//!     .list_commits(&WalkOptions::default().since("2w"))
//!     .expect("list commits");
//!
//! for c in commits {
//!     println!("{} - {}", c.hash, c.subject());
//! }
//! ```

#![warn(missing_docs)]

pub mod commit;
pub mod error;
pub mod extract;
pub mod timespec;

pub use commit::{CommitRecord, SHORT_HASH_LEN};
pub use error::GitError;
pub use extract::{
    BranchComparison, CompareOptions, DEFAULT_CONTEXT_SIZE, HistoryExtractor, WalkOptions,
};
pub use timespec::{TimeWindow, parse_time_spec, parse_timestamp};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commit::CommitRecord;
    pub use crate::error::GitError;
    pub use crate::extract::{BranchComparison, CompareOptions, HistoryExtractor, WalkOptions};
}
