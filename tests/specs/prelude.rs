// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for the specs.

pub use rop_adapters::{FakeJobAdapter, FakeResourceStore, JobOutcome, RenovateJob, RenovateJobSpec};
pub use rop_core::test_support::projects;
pub use rop_core::{discovery_job_name, executor_job_name, FakeClock, ResourceId, RetryPolicy, Status};
pub use rop_engine::{EngineConfig, Operator, SweepOutcome};
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tokio_util::sync::CancellationToken;
pub use Status::*;

use rop_adapters::JobAdapter;

pub const NS: &str = "renovate";
pub const NAME: &str = "platform";

pub fn id() -> ResourceId {
    ResourceId::new(NAME, NS)
}

pub fn resource(parallelism: i32, entries: &[(&str, Status)]) -> RenovateJob {
    let spec = RenovateJobSpec {
        schedule: "*/30 * * * *".to_string(),
        image: "renovate/renovate:41".to_string(),
        discovery_filter: "acme/*".to_string(),
        parallelism,
        ..Default::default()
    };
    let mut resource = RenovateJob::new(NAME, spec);
    resource.metadata.namespace = Some(NS.to_string());
    if !entries.is_empty() {
        resource.projects_mut().extend(projects(entries));
    }
    resource
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
        .retry(RetryPolicy::default().initial_delay(Duration::from_millis(10)))
        .executor_interval(Duration::from_millis(100))
        .discovery_poll(Duration::from_millis(20))
}

pub fn pairs(list: &[(&str, Status)]) -> Vec<(String, Status)> {
    list.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

/// Fake cluster plus an operator wired to it.
pub struct World {
    pub store: FakeResourceStore,
    pub jobs: FakeJobAdapter,
    pub operator: Operator<FakeClock>,
}

impl World {
    pub fn new() -> Self {
        let jobs = FakeJobAdapter::new();
        Self::with_jobs(jobs.clone(), Arc::new(jobs))
    }

    /// A world whose operator talks to `adapter`; `jobs` is the fake behind it.
    pub fn with_jobs(jobs: FakeJobAdapter, adapter: Arc<dyn JobAdapter>) -> Self {
        let store = FakeResourceStore::new();
        let operator = Operator::new(
            Arc::new(store.clone()),
            adapter,
            config(),
            FakeClock::new(),
            CancellationToken::new(),
        );
        Self { store, jobs, operator }
    }

    /// Make the next discovery job succeed, printing `output`.
    pub fn discovers(&self, output: &str) {
        self.jobs.on_create(NS, &discovery_job_name(NAME), JobOutcome::Succeed { logs: output.into() });
    }

    pub fn statuses(&self) -> Vec<(String, Status)> {
        self.store
            .resource(&id())
            .map(|r| r.projects().iter().map(|p| (p.name.clone(), p.status)).collect())
            .unwrap_or_default()
    }
}
