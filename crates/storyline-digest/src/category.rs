// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Semantic commit categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic label assigned to a commit
///
/// Variants are declared in classification priority order, so the derived
/// `Ord` sorts categories the way they are tried and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// New functionality
    Feature,
    /// Bug fixes
    Bugfix,
    /// Code restructuring
    Refactor,
    /// Documentation changes
    Docs,
    /// Formatting and lint fixes
    Style,
    /// Test additions and changes
    Test,
    /// Build, dependency and maintenance work
    Chore,
    /// Anything not matched by a pattern
    Other,
}

impl Category {
    /// Every category, in priority order
    pub const ALL: [Category; 8] = [
        Category::Feature,
        Category::Bugfix,
        Category::Refactor,
        Category::Docs,
        Category::Style,
        Category::Test,
        Category::Chore,
        Category::Other,
    ];

    /// Lowercase name used in serialized output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Feature => "feature",
            Category::Bugfix => "bugfix",
            Category::Refactor => "refactor",
            Category::Docs => "docs",
            Category::Style => "style",
            Category::Test => "test",
            Category::Chore => "chore",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}
