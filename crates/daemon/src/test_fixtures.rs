// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for controller and lifecycle tests.

use rop_adapters::{FakeJobAdapter, FakeResourceStore, RenovateJob, RenovateJobSpec};
use rop_core::{FakeClock, ResourceId, RetryPolicy};
use rop_engine::{EngineConfig, Operator};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const NS: &str = "tools";

pub fn id(name: &str) -> ResourceId {
    ResourceId::new(name, NS)
}

pub fn make_resource(name: &str, schedule: &str) -> RenovateJob {
    let spec = RenovateJobSpec {
        schedule: schedule.to_string(),
        image: "renovate/renovate:41".to_string(),
        parallelism: 1,
        ..Default::default()
    };
    let mut resource = RenovateJob::new(name, spec);
    resource.metadata.namespace = Some(NS.to_string());
    resource
}

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .retry(RetryPolicy::default().initial_delay(Duration::from_millis(10)))
        .executor_interval(Duration::from_millis(100))
        .discovery_poll(Duration::from_millis(50))
        .sync_interval(Duration::from_millis(500))
}

pub fn make_operator(store: &FakeResourceStore, jobs: &FakeJobAdapter) -> Arc<Operator<FakeClock>> {
    Arc::new(Operator::new(
        Arc::new(store.clone()),
        Arc::new(jobs.clone()),
        test_config(),
        FakeClock::new(),
        CancellationToken::new(),
    ))
}
