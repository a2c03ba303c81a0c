// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone};
use yare::parameterized;

fn five_past() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()
}

#[test]
fn trailing_directive_sets_exact_instant() {
    let output = "synced 42 rows\n_qs_next_run: 2024-01-01T00:05:00+00:00\n";
    assert_eq!(parse_next_run_directive(output), Ok(Some(five_past())));
}

#[test]
fn offsets_are_normalised_to_utc() {
    let output = "_qs_next_run: 2024-01-01T02:05:00+02:00";
    assert_eq!(parse_next_run_directive(output), Ok(Some(five_past())));
}

#[test]
fn naive_timestamps_are_taken_as_utc() {
    let output = "_qs_next_run: 2024-01-01T00:05:00.000";
    assert_eq!(parse_next_run_directive(output), Ok(Some(five_past())));
}

#[parameterized(
    empty = { "" },
    only_blank = { "\n\n  \n" },
    no_marker = { "done\n" },
    directive_not_last = { "_qs_next_run: 2024-01-01T00:05:00+00:00\nmore output" },
)]
fn absent_directive_is_none(output: &str) {
    assert_eq!(parse_next_run_directive(output), Ok(None));
}

#[test]
fn trailing_blank_lines_are_ignored() {
    let output = "_qs_next_run: 2024-01-01T00:05:00+00:00\n\n   \n";
    assert_eq!(parse_next_run_directive(output), Ok(Some(five_past())));
}

#[test]
fn malformed_directive_is_an_error() {
    let err = parse_next_run_directive("ok\n_qs_next_run: tomorrow-ish").unwrap_err();
    assert_eq!(err.line, "_qs_next_run: tomorrow-ish");
}

#[test]
fn formatted_directive_parses_back() {
    let at = five_past() + Duration::milliseconds(250);
    let line = format_next_run_directive(at);
    assert!(line.starts_with(NEXT_RUN_MARKER));
    assert_eq!(parse_next_run_directive(&line), Ok(Some(at)));
}
