// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue detection over NDJSON run logs.

use serde::Deserialize;

/// Lowest level counted as an issue (`warn`; `error` is 50, `fatal` 60).
pub const ISSUE_LEVEL: i64 = 40;

#[derive(Deserialize)]
struct LogLine {
    #[serde(default)]
    level: i64,
}

/// Whether any line of `logs` is a JSON record at `warn` level or above.
///
/// Lines that are blank or not JSON objects are skipped.
pub fn has_issues(logs: &str) -> bool {
    logs.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<LogLine>(line).ok())
        .any(|line| line.level >= ISSUE_LEVEL)
}
