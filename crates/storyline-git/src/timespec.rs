// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Time bounds for history walks
//!
//! A bound is either an absolute timestamp (RFC 3339, `YYYY-MM-DDTHH:MM:SS`
//! or `YYYY-MM-DD`) or a relative duration `<integer><unit>` counted back
//! from "now", where the unit is one of:
//!
//! | Unit | Meaning |
//! |------|---------|
//! | `d`  | days |
//! | `w`  | weeks |
//! | `m`  | 30-day months |
//! | `y`  | 365-day years |
//!
//! Naive timestamps (no offset) are read as UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;

use crate::error::GitError;

static RELATIVE_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([dwmy])$").expect("relative time pattern is valid"));

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an absolute timestamp, normalizing to UTC
///
/// Returns `None` if the value is empty or not a recognised ISO 8601 form.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Resolve a time argument against `now`
///
/// # Errors
///
/// Returns `GitError::InvalidTimeSpec` if the argument is neither an absolute
/// timestamp nor a relative duration, or if the duration overflows.
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, GitError> {
    if let Some(absolute) = parse_timestamp(spec) {
        return Ok(absolute);
    }

    let invalid = || GitError::InvalidTimeSpec {
        spec: spec.to_string(),
    };

    let captures = RELATIVE_SPEC.captures(spec.trim()).ok_or_else(invalid)?;
    let amount: i64 = captures[1].parse().map_err(|_| invalid())?;
    let days_per_unit = match &captures[2] {
        "d" => 1,
        "w" => 7,
        "m" => 30,
        "y" => 365,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(days_per_unit)
        .and_then(TimeDelta::try_days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(invalid)
}

/// Resolved `[since, until]` window for a history walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Commits older than this stop the walk (None = unbounded)
    pub since: Option<DateTime<Utc>>,
    /// Commits newer than this are skipped
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolve optional `since`/`until` arguments; `until` defaults to `now`
    ///
    /// # Errors
    ///
    /// Returns `GitError::InvalidTimeSpec` if either argument is unparseable.
    pub fn resolve(
        since: Option<&str>,
        until: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, GitError> {
        let since = since.map(|spec| parse_time_spec(spec, now)).transpose()?;
        let until = match until {
            Some(spec) => parse_time_spec(spec, now)?,
            None => now,
        };
        Ok(Self { since, until })
    }

    /// True if `time` is older than the window start
    #[must_use]
    pub fn is_before_start(&self, time: DateTime<Utc>) -> bool {
        self.since.is_some_and(|since| time < since)
    }

    /// True if `time` is newer than the window end
    #[must_use]
    pub fn is_after_end(&self, time: DateTime<Utc>) -> bool {
        time > self.until
    }

    /// True if `time` falls inside the window
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        !self.is_before_start(time) && !self.is_after_end(time)
    }
}
