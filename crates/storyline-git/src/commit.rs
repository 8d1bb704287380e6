//! Commit record type shared by every pipeline stage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timespec::parse_timestamp;

/// Number of hex characters kept in a commit's short hash
pub const SHORT_HASH_LEN: usize = 8;

/// One commit as extracted from the repository
///
/// String fields are kept as plain strings rather than parsed types so that
/// records coming from other sources can be checked (and dropped) by the
/// validation layer instead of failing deserialization wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Short commit hash
    pub hash: String,
    /// Author display name
    pub author: String,
    /// Author email, used as the identity key when present
    pub email: String,
    /// Commit time as an RFC 3339 string (UTC)
    pub timestamp: String,
    /// Full commit message, trimmed
    pub message: String,
    /// Paths touched by the commit, in diff order
    pub files_changed: Vec<String>,
    /// Lines added
    pub insertions: usize,
    /// Lines removed
    pub deletions: usize,
    /// Raw diff text, or an error placeholder if extraction failed
    pub diff: String,
}

impl CommitRecord {
    /// Shorten a full SHA to [`SHORT_HASH_LEN`] characters
    #[must_use]
    pub fn short_hash(sha: &str) -> &str {
        sha.char_indices()
            .nth(SHORT_HASH_LEN)
            .map_or(sha, |(idx, _)| &sha[..idx])
    }

    /// Get the first line of the commit message (subject)
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Identity key used to consolidate authors: email, or name if no email
    #[must_use]
    pub fn identity(&self) -> &str {
        if self.email.trim().is_empty() {
            &self.author
        } else {
            &self.email
        }
    }

    /// Parse the timestamp field, if it is a valid point in time
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Total changed lines (insertions plus deletions)
    #[must_use]
    pub fn line_delta(&self) -> usize {
        self.insertions + self.deletions
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: short_hash never exceeds SHORT_HASH_LEN and is a prefix
        #[test]
        fn prop_short_hash_is_bounded_prefix(sha in "[0-9a-f]{0,40}") {
            let short = CommitRecord::short_hash(&sha);
            prop_assert!(short.len() <= SHORT_HASH_LEN);
            prop_assert!(sha.starts_with(short));
        }

        /// Property: subject is always a prefix of the message
        #[test]
        fn prop_subject_is_prefix_of_message(message in ".*") {
            let commit = CommitRecord { message, ..Default::default() };
            prop_assert!(commit.message.starts_with(commit.subject()));
        }

        /// Property: identity is never empty when the author name is not
        #[test]
        fn prop_identity_non_empty(author in "[A-Za-z]{1,20}", email in "([a-z]+@[a-z]+\\.[a-z]+)?") {
            let commit = CommitRecord { author, email, ..Default::default() };
            prop_assert!(!commit.identity().is_empty());
        }
    }
}
