// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project status state machine.
//!
//! A project only ever moves `Scheduled → Running → {Completed, Failed}` and
//! back to `Scheduled` once a run has landed. Every other requested
//! transition is a no-op: a late "mark running" signal cannot clobber a
//! result, and rescheduling cannot interrupt an in-flight run.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a single project within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl Status {
    /// Whether a run has landed (no further transition without a reschedule).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

crate::simple_display! {
    Status {
        Scheduled => "scheduled",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Compute the next status for a project.
///
/// Pure and total. See the module docs for the legal moves.
pub fn advance(current: Status, desired: Status) -> Status {
    use Status::*;
    match (current, desired) {
        (Running, Scheduled) => Running,
        (_, Scheduled) => Scheduled,
        (Scheduled, Running) => Running,
        (Running, Completed) => Completed,
        (Running, Failed) => Failed,
        (current, _) => current,
    }
}

/// Observed phase of a compute job, as read from the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Running,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::Running)
    }
}

crate::simple_display! {
    JobPhase {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

impl From<JobPhase> for Status {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Running => Status::Running,
            JobPhase::Completed => Status::Completed,
            JobPhase::Failed => Status::Failed,
        }
    }
}

/// Persisted status record of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub name: String,
    pub status: Status,
    /// When the record was created or its last run landed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

impl ProjectStatus {
    /// A freshly discovered project, waiting for its first run.
    pub fn scheduled(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { name: name.into(), status: Status::Scheduled, last_run: Some(now) }
    }

    /// Apply `desired` through [`advance`].
    ///
    /// Stamps `last_run` when the record newly lands in a terminal status.
    /// Returns whether the status changed.
    pub fn apply(&mut self, desired: Status, now: DateTime<Utc>) -> bool {
        let next = advance(self.status, desired);
        if next == self.status {
            return false;
        }
        if next.is_terminal() {
            self.last_run = Some(now);
        }
        self.status = next;
        true
    }
}

crate::builder! {
    pub struct ProjectStatusBuilder => ProjectStatus {
        into {
            name: String = "org/repo",
        }
        set {
            status: Status = Status::Scheduled,
        }
        option {
            last_run: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
