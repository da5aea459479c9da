// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project status specs
//!
//! Status changes go through the transition guard, and reconciling against a
//! discovered list keeps known records while dropping vanished projects.

use crate::prelude::*;
use proptest::prelude::*;
use rop_core::test_support::strategies::{arb_project_names, arb_status};
use similar_asserts::assert_eq;

#[tokio::test]
async fn late_running_signal_cannot_clobber_a_result() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Completed)]));

    world.operator.manager().update_one(&id(), "acme/api", Running).await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("acme/api", Completed)]));
    assert_eq!(world.store.update_count(), 0);
}

#[yare::parameterized(
    schedule_completed = { Completed, Scheduled, Scheduled },
    schedule_failed    = { Failed, Scheduled, Scheduled },
    schedule_running   = { Running, Scheduled, Running },
    start_scheduled    = { Scheduled, Running, Running },
    finish_running     = { Running, Completed, Completed },
    fail_running       = { Running, Failed, Failed },
    finish_scheduled   = { Scheduled, Completed, Scheduled },
)]
fn update_one_follows_the_transition_guard(current: Status, desired: Status, expected: Status) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(async {
        use similar_asserts::assert_eq;
        let world = World::new();
        world.store.put(resource(1, &[("acme/api", current)]));

        world.operator.manager().update_one(&id(), "acme/api", desired).await.unwrap();

        assert_eq!(world.statuses(), pairs(&[("acme/api", expected)]));
    });
}

#[tokio::test]
async fn run_project_requeues_a_finished_project() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Failed)]));

    world.operator.run_project(&id(), "acme/api").await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("acme/api", Scheduled)]));
}

#[tokio::test]
async fn reconcile_keeps_known_and_drops_vanished_projects() {
    let world = World::new();
    world.store.put(resource(1, &[("a", Completed), ("c", Scheduled)]));

    let discovered = vec!["a".to_string(), "b".to_string()];
    world.operator.manager().reconcile(&id(), &discovered).await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Completed), ("b", Scheduled)]));
}

#[tokio::test]
async fn batched_update_persists_once() {
    let world = World::new();
    world.store.put(resource(3, &[("a", Completed), ("b", Failed), ("c", Running)]));

    world
        .operator
        .manager()
        .update_batched(&id(), |p| p.status != Running, Scheduled)
        .await
        .unwrap();

    assert_eq!(world.statuses(), pairs(&[("a", Scheduled), ("b", Scheduled), ("c", Running)]));
    assert_eq!(world.store.update_count(), 1);
}

#[tokio::test]
async fn conflicting_writer_is_absorbed_by_reloading() {
    let world = World::new();
    world.store.put(resource(1, &[("acme/api", Scheduled)]));
    world.store.fail_updates([rop_adapters::StoreError::Conflict(NAME.to_string())]);

    world.operator.manager().update_one(&id(), "acme/api", Running).await.unwrap();

    assert_eq!(world.statuses(), pairs(&[("acme/api", Running)]));
    assert_eq!(world.store.update_count(), 2);
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(
        existing in arb_project_names(6),
        statuses in proptest::collection::vec(arb_status(), 6),
        discovered in arb_project_names(6),
    ) {
        let entries: Vec<(&str, Status)> =
            existing.iter().map(String::as_str).zip(statuses.iter().copied()).collect();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (first, second, writes_before, writes_after) = runtime.block_on(async {
            let world = World::new();
            world.store.put(resource(1, &entries));
            let manager = world.operator.manager();

            let first = manager.reconcile(&id(), &discovered).await.unwrap();
            let writes_before = world.store.update_count();
            let second = manager.reconcile(&id(), &discovered).await.unwrap();
            (first.projects().to_vec(), second.projects().to_vec(), writes_before, world.store.update_count())
        });

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(writes_before, writes_after);
        let names: Vec<&str> = first.iter().map(|p| p.name.as_str()).collect();
        let mut expected: Vec<&str> = Vec::new();
        for name in &discovered {
            if !expected.contains(&name.as_str()) {
                expected.push(name.as_str());
            }
        }
        prop_assert_eq!(names, expected);
    }
}
