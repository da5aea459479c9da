// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery specs
//!
//! A manual discovery creates the discovery job, waits for it and reconciles
//! the printed project list into the resource.

use crate::prelude::*;
use rop_adapters::{build_discovery_job, JobSettings};
use rop_engine::EngineError;
use similar_asserts::assert_eq;

#[tokio::test]
async fn discovery_reconciles_the_printed_projects() {
    let world = World::new();
    world.store.put(resource(1, &[("a", Completed), ("c", Scheduled)]));
    world.discovers(r#"["b", "a"]"#);

    let handle = world.operator.start_discovery(&id()).await.unwrap();
    handle.await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Completed), ("b", Scheduled)]));
    assert_eq!(world.operator.discovery_status(&id()).await.unwrap(), Completed);
}

#[tokio::test]
async fn discovery_job_carries_the_filter() {
    let world = World::new();
    world.store.put(resource(1, &[]));
    world.discovers(r#"["a"]"#);

    world.operator.start_discovery(&id()).await.unwrap().await.unwrap();

    let job = world.jobs.job(NS, &discovery_job_name(NAME)).unwrap();
    let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap_or_default();
    assert!(env.iter().any(|e| e.name == "RENOVATE_AUTODISCOVER_FILTER"
        && e.value.as_deref() == Some("acme/*")));
}

#[tokio::test]
async fn running_discovery_is_not_started_twice() {
    let world = World::new();
    let declared = resource(1, &[]);
    world.store.put(declared.clone());
    world.jobs.insert_job(build_discovery_job(&declared, &JobSettings::default()));

    let err = world.operator.start_discovery(&id()).await.unwrap_err();

    assert_eq!(err, EngineError::DiscoveryAlreadyRunning(id()));
    assert!(world.jobs.created().is_empty());
}

#[tokio::test]
async fn failed_discovery_leaves_projects_untouched() {
    let world = World::new();
    world.store.put(resource(1, &[("a", Completed)]));
    world.jobs.on_create(NS, &discovery_job_name(NAME), JobOutcome::Fail);

    world.operator.start_discovery(&id()).await.unwrap().await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Completed)]));
    assert_eq!(world.operator.discovery_status(&id()).await.unwrap(), Failed);
}

#[tokio::test]
async fn empty_discovery_output_is_not_applied() {
    let world = World::new();
    world.store.put(resource(1, &[("a", Completed)]));
    world.discovers("[]");

    world.operator.start_discovery(&id()).await.unwrap().await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Completed)]));
}

#[tokio::test]
async fn no_discovery_job_reads_as_scheduled() {
    let world = World::new();
    world.store.put(resource(1, &[]));

    assert_eq!(world.operator.discovery_status(&id()).await.unwrap(), Scheduled);
}
