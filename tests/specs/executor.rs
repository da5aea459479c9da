// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor specs
//!
//! Sweeps start scheduled projects up to the resource's parallelism, collect
//! the results of landed jobs, and never overlap for one resource.

use crate::prelude::*;
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use rop_adapters::{JobAdapter, JobError};
use similar_asserts::assert_eq;

#[tokio::test]
async fn first_sweep_starts_one_job_per_free_slot() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Scheduled), ("acme/web", Scheduled)]));

    let outcome = world.operator.executor().sweep(&id()).await.unwrap();

    assert_eq!(outcome, SweepOutcome::Swept { started: 1, finished: 0 });
    assert_eq!(world.statuses(), pairs(&[("acme/api", Running), ("acme/web", Scheduled)]));
    assert_eq!(world.jobs.created(), vec![executor_job_name(NAME, "acme/api")]);
}

#[tokio::test]
async fn completed_job_frees_a_slot() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Scheduled), ("acme/web", Scheduled)]));
    let executor = world.operator.executor();
    executor.sweep(&id()).await.unwrap();

    world.jobs.set_condition(NS, &executor_job_name(NAME, "acme/api"), "Complete");
    let outcome = executor.sweep(&id()).await.unwrap();

    assert_eq!(outcome, SweepOutcome::Swept { started: 1, finished: 1 });
    assert_eq!(world.statuses(), pairs(&[("acme/api", Completed), ("acme/web", Running)]));
}

#[tokio::test]
async fn failed_job_marks_the_project_failed() {
    let world = World::new();
    world.store.put(resource(2, &[("acme/api", Scheduled)]));
    let executor = world.operator.executor();
    executor.sweep(&id()).await.unwrap();

    world.jobs.set_condition(NS, &executor_job_name(NAME, "acme/api"), "Failed");
    executor.sweep(&id()).await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("acme/api", Failed)]));
}

#[tokio::test]
async fn zero_parallelism_starts_nothing() {
    let world = World::new();
    world.store.put(resource(0, &[("acme/api", Scheduled)]));

    let outcome = world.operator.executor().sweep(&id()).await.unwrap();

    assert_eq!(outcome, SweepOutcome::Swept { started: 0, finished: 0 });
    assert!(world.jobs.created().is_empty());
}

/// Job adapter whose creates take a while, keeping a sweep in flight.
struct SlowCreates {
    inner: FakeJobAdapter,
    delay: Duration,
}

#[async_trait]
impl JobAdapter for SlowCreates {
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, JobError> {
        self.inner.get_job(namespace, name).await
    }

    async fn create_job(&self, job: &Job) -> Result<(), JobError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_job(job).await
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), JobError> {
        self.inner.delete_job(namespace, name).await
    }

    async fn list_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<Pod>, JobError> {
        self.inner.list_pods(namespace, job_name).await
    }

    async fn pod_logs(&self, namespace: &str, pod_name: &str) -> Result<String, JobError> {
        self.inner.pod_logs(namespace, pod_name).await
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_sweeps_of_one_resource_do_not_overlap() {
    let jobs = FakeJobAdapter::new();
    let slow = SlowCreates { inner: jobs.clone(), delay: Duration::from_secs(1) };
    let world = World::with_jobs(jobs, Arc::new(slow));
    world.store.put(resource(2, &[("acme/api", Scheduled), ("acme/web", Scheduled)]));
    let executor = world.operator.executor();

    let rid = id();
    let (first, second) = tokio::join!(executor.sweep(&rid), executor.sweep(&rid));

    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, SweepOutcome::Skipped));
    assert_eq!(outcomes, vec![SweepOutcome::Swept { started: 2, finished: 0 }, SweepOutcome::Skipped]);
    assert_eq!(world.jobs.created().len(), 2);
    assert_eq!(world.statuses(), pairs(&[("acme/api", Running), ("acme/web", Running)]));
}

#[tokio::test(start_paused = true)]
async fn executor_loop_drains_the_queue() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Scheduled), ("acme/web", Scheduled)]));
    let cancel = CancellationToken::new();
    let handle = world.operator.spawn_executor(cancel.clone());

    tokio::time::sleep(Duration::from_millis(50)).await;
    world.jobs.set_condition(NS, &executor_job_name(NAME, "acme/api"), "Complete");
    tokio::time::sleep(Duration::from_millis(100)).await;
    world.jobs.set_condition(NS, &executor_job_name(NAME, "acme/web"), "Complete");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(world.statuses(), pairs(&[("acme/api", Completed), ("acme/web", Completed)]));
    assert!(world.operator.health().executor.running);
    cancel.cancel();
    handle.await.unwrap();
    assert!(!world.operator.health().executor.running);
}
