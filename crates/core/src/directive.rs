// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Next-run directive
//!
//! A scheduler-aware program may end its output with
//!
//! ```text
//! _qs_next_run: 2024-01-01T00:05:00+00:00
//! ```
//!
//! to choose its own next run time instead of the fixed interval.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Prefix of the directive line
pub const NEXT_RUN_MARKER: &str = "_qs_next_run:";

/// Environment variable set to `1` for scheduler-invoked programs
pub const CONTEXT_ENV: &str = "QS_CONTEXT";

/// Environment variable carrying the suggested next-run interval in seconds
pub const NEXT_INTERVAL_ENV: &str = "QS_NEXT_INTERVAL";

#[derive(Debug, Error, PartialEq)]
#[error("malformed next-run directive {line:?}: {reason}")]
pub struct DirectiveError {
    pub line: String,
    pub reason: String,
}

/// Render the directive line for `at`
pub fn format_next_run_directive(at: DateTime<Utc>) -> String {
    format!("{} {}", NEXT_RUN_MARKER, at.to_rfc3339())
}

/// Look for a directive on the trailing non-blank line of `output`.
///
/// Returns `Ok(None)` when the last line is not a directive. A line that
/// carries the marker but no parseable timestamp is an error.
pub fn parse_next_run_directive(output: &str) -> Result<Option<DateTime<Utc>>, DirectiveError> {
    let Some(last) = output.lines().rev().find(|line| !line.trim().is_empty()) else {
        return Ok(None);
    };
    let Some(value) = last.trim().strip_prefix(NEXT_RUN_MARKER) else {
        return Ok(None);
    };
    parse_timestamp(value.trim())
        .map(Some)
        .ok_or_else(|| DirectiveError {
            line: last.to_string(),
            reason: "expected an ISO-8601 timestamp".to_string(),
        })
}

/// Accepts RFC 3339 (any offset) or a naive ISO-8601 time taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "directive_tests.rs"]
mod tests;
