// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled cycle specs
//!
//! Reconciling a resource installs its cron entry; every firing rediscovers
//! the projects and requeues the ones that are not running.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn firing_rediscovers_and_requeues_idle_projects() {
    let world = World::new();
    world.store.put(resource(2, &[("a", Completed), ("b", Running), ("d", Failed)]));
    world.discovers(r#"["a", "b", "c"]"#);
    world.operator.reconcile(&id()).await.unwrap();

    world.operator.scheduler().run_now(&id().key()).unwrap().await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Scheduled), ("b", Running), ("c", Scheduled)]));
}

#[tokio::test(start_paused = true)]
async fn schedule_fires_on_its_cron_expression() {
    let world = World::new();
    world.store.put(resource(1, &[("a", Completed)]));
    world.discovers(r#"["a"]"#);
    world.operator.reconcile(&id()).await.unwrap();
    world.operator.start();

    tokio::time::sleep(Duration::from_secs(29 * 60)).await;
    assert_eq!(world.statuses(), pairs(&[("a", Completed)]));

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(world.statuses(), pairs(&[("a", Scheduled)]));

    let health = world.operator.health();
    let entry = &health.scheduler.entries[&id().key()];
    assert!(entry.last_fired.is_some());
    assert!(!entry.is_running);
    world.operator.stop();
}

#[tokio::test]
async fn schedule_change_replaces_the_entry() {
    let world = World::new();
    world.store.put(resource(1, &[]));
    world.operator.reconcile(&id()).await.unwrap();
    let before = world.operator.scheduler().entry_id(&id().key());

    let mut changed = resource(1, &[]);
    changed.spec.schedule = "0 4 * * 1-5".to_string();
    world.store.put(changed);
    world.operator.reconcile(&id()).await.unwrap();

    assert_ne!(world.operator.scheduler().entry_id(&id().key()), before);
    assert_eq!(world.operator.scheduler().len(), 1);
}

#[tokio::test]
async fn unchanged_schedule_keeps_the_entry() {
    let world = World::new();
    world.store.put(resource(1, &[]));
    world.operator.reconcile(&id()).await.unwrap();
    let before = world.operator.scheduler().entry_id(&id().key());

    world.operator.reconcile(&id()).await.unwrap();

    assert_eq!(world.operator.scheduler().entry_id(&id().key()), before);
}

#[tokio::test]
async fn deleted_resource_loses_its_schedule() {
    let world = World::new();
    world.store.put(resource(1, &[]));
    world.operator.sync_all().await.unwrap();
    assert_eq!(world.operator.scheduler().len(), 1);

    world.store.remove(&id());
    world.operator.sync_all().await.unwrap();

    assert!(world.operator.scheduler().is_empty());
    assert!(world.operator.health().scheduler.entries.is_empty());
}
