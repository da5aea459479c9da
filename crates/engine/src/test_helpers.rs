// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by the engine's unit tests.

use crate::config::EngineConfig;
use crate::status_manager::ProjectStatusManager;
use rop_adapters::{FakeJobAdapter, FakeResourceStore, RenovateJob, RenovateJobSpec};
use rop_core::test_support::projects;
use rop_core::{FakeClock, ResourceId, RetryPolicy, Status};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const NS: &str = "tools";

pub(crate) fn id(name: &str) -> ResourceId {
    ResourceId::new(name, NS)
}

/// A stored-shape resource with the given parallelism and project records.
pub(crate) fn resource(name: &str, parallelism: i32, entries: &[(&str, Status)]) -> RenovateJob {
    let spec = RenovateJobSpec {
        schedule: "0 * * * *".to_string(),
        image: "renovate/renovate:41".to_string(),
        parallelism,
        ..Default::default()
    };
    let mut job = RenovateJob::new(name, spec);
    job.metadata.namespace = Some(NS.to_string());
    if !entries.is_empty() {
        job.projects_mut().extend(projects(entries));
    }
    job
}

pub(crate) fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().initial_delay(Duration::from_millis(10))
}

pub(crate) fn config() -> EngineConfig {
    EngineConfig::default()
        .retry(fast_retry())
        .executor_interval(Duration::from_millis(100))
        .discovery_poll(Duration::from_millis(50))
}

pub(crate) struct Fixture {
    pub store: FakeResourceStore,
    pub jobs: FakeJobAdapter,
    pub clock: FakeClock,
}

impl Fixture {
    pub fn new() -> Self {
        Self { store: FakeResourceStore::new(), jobs: FakeJobAdapter::new(), clock: FakeClock::new() }
    }

    pub fn manager(&self) -> Arc<ProjectStatusManager<FakeClock>> {
        Arc::new(ProjectStatusManager::new(
            Arc::new(self.store.clone()),
            Arc::new(self.jobs.clone()),
            fast_retry(),
            self.clock.clone(),
        ))
    }

    /// `(name, status)` pairs as currently stored.
    pub fn statuses(&self, name: &str) -> Vec<(String, Status)> {
        self.store
            .resource(&id(name))
            .map(|r| r.projects().iter().map(|p| (p.name.clone(), p.status)).collect())
            .unwrap_or_default()
    }
}
