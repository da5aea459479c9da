// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ProjectStatus, Status};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::Status;
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Scheduled),
            Just(Status::Running),
            Just(Status::Completed),
            Just(Status::Failed),
        ]
    }

    /// `org/repo` style project names.
    pub fn arb_project_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,11}/[a-z][a-z0-9._-]{0,15}"
    }

    /// Distinct project names, sorted.
    pub fn arb_project_names(max: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::btree_set(arb_project_name(), 0..=max)
            .prop_map(|names| names.into_iter().collect())
    }
}

// ── Record factories ────────────────────────────────────────────────────

/// A project record with the given status and no run stamp.
pub fn project(name: &str, status: Status) -> ProjectStatus {
    ProjectStatus::builder().name(name).status(status).build()
}

/// Records for `(name, status)` pairs, in order.
pub fn projects(entries: &[(&str, Status)]) -> Vec<ProjectStatus> {
    entries.iter().map(|(name, status)| project(name, *status)).collect()
}
