// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! storyline-digest: classification, reduction and validation of commit history
//!
//! This library crate turns [`CommitRecord`](storyline_git::CommitRecord)s
//! into a bounded, validated report for downstream narrative generation, and
//! compares two branches into a [`DivergenceResult`].
//!
//! # Example
//!
//! ```no_run
//! use storyline_digest::{Pipeline, ValidationPolicy};
//! use storyline_git::WalkOptions;
//!
//! let pipeline = Pipeline::open(".", ValidationPolicy::Fallback).expect("open repo");
//! let report = pipeline
//!     .summarize(&WalkOptions::default().since("2w"))
//!     .expect("summarize");
//!
//! println!("{}", report.digest());
//! ```

#![warn(missing_docs)]

pub mod category;
pub mod classify;
pub mod divergence;
pub mod error;
pub mod pipeline;
pub mod reduce;
pub mod validation;

pub use category::Category;
pub use classify::{
    AuthorSummary, Bucket, ClassifiedSet, Classify, CommitClassifier, Stats, classify_message,
};
pub use divergence::{
    DivergenceAnalyzer, DivergenceMetrics, DivergenceResult, FileOverlap, humanize_elapsed,
};
pub use error::{PipelineError, Stage};
pub use pipeline::{CommitSource, Pipeline};
pub use reduce::{
    CommitDigest, DataReducer, HistoryReport, PARTIAL_DIGEST_PLACEHOLDER, PartialReport,
    ReducedReport, Reduce, ReportMetadata, chunk_diff, clip_message, truncate_message,
};
pub use validation::{
    CommitDefect, PipelineState, SchemaViolation, ValidationGate, ValidationPolicy,
    ValidationReport, validate_commit, validate_commits,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classify::{Classify, CommitClassifier};
    pub use crate::divergence::DivergenceResult;
    pub use crate::error::PipelineError;
    pub use crate::pipeline::{CommitSource, Pipeline};
    pub use crate::reduce::{DataReducer, HistoryReport, Reduce};
    pub use crate::validation::{ValidationPolicy, ValidationReport};
}
