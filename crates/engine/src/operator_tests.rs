// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{config, id, resource, Fixture, NS};
use chrono::{TimeZone, Utc};
use rop_adapters::{build_discovery_job, JobOutcome, JobSettings};
use rop_core::{discovery_job_name, FakeClock};
use Status::*;

fn operator(fx: &Fixture) -> Operator<FakeClock> {
    Operator::new(
        Arc::new(fx.store.clone()),
        Arc::new(fx.jobs.clone()),
        config(),
        fx.clock.clone(),
        CancellationToken::new(),
    )
}

fn pairs(list: &[(&str, Status)]) -> Vec<(String, Status)> {
    list.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

fn discovers(fx: &Fixture, projects: &str) {
    fx.jobs.on_create(NS, &discovery_job_name("renovate"), JobOutcome::Succeed { logs: projects.into() });
}

#[tokio::test]
async fn reconcile_installs_the_resource_schedule() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[]));
    let operator = operator(&fx);

    operator.reconcile(&id("renovate")).await.unwrap();

    let next = operator.scheduler().next_run(&id("renovate").key());
    assert_eq!(next, Some(Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap()));
}

#[tokio::test]
async fn reconcile_rejects_a_malformed_schedule() {
    let fx = Fixture::new();
    let mut broken = resource("renovate", 1, &[]);
    broken.spec.schedule = "whenever".to_string();
    fx.store.put(broken);

    let err = operator(&fx).reconcile(&id("renovate")).await.unwrap_err();

    assert!(matches!(err, EngineError::InvalidExpression { .. }));
}

#[tokio::test]
async fn reconcile_of_deleted_resource_forgets_it() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[]));
    let operator = operator(&fx);
    operator.reconcile(&id("renovate")).await.unwrap();

    fx.store.remove(&id("renovate"));
    operator.reconcile(&id("renovate")).await.unwrap();

    assert!(operator.scheduler().is_empty());
}

#[tokio::test]
async fn sync_all_tracks_the_declared_set() {
    let fx = Fixture::new();
    fx.store.put(resource("alpha", 1, &[]));
    fx.store.put(resource("beta", 1, &[]));
    let operator = operator(&fx);
    operator.sync_all().await.unwrap();
    assert_eq!(operator.scheduler().len(), 2);

    fx.store.remove(&id("alpha"));
    operator.sync_all().await.unwrap();

    assert_eq!(operator.scheduler().len(), 1);
    assert!(operator.scheduler().entry_id(&id("beta").key()).is_some());
}

#[tokio::test]
async fn scheduled_cycle_reconciles_and_reschedules() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[("a", Completed), ("c", Scheduled)]));
    discovers(&fx, "[\"b\",\"a\"]");
    let operator = operator(&fx);
    operator.reconcile(&id("renovate")).await.unwrap();

    operator.scheduler().run_now(&id("renovate").key()).unwrap().await.unwrap();

    assert_eq!(fx.statuses("renovate"), pairs(&[("a", Scheduled), ("b", Scheduled)]));
}

#[tokio::test]
async fn scheduled_cycle_reloads_the_resource() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[]));
    let operator = operator(&fx);
    operator.reconcile(&id("renovate")).await.unwrap();

    // Discovery settings changed after the schedule was installed
    let mut updated = resource("renovate", 1, &[]);
    updated.spec.discovery_filter = "org/*".to_string();
    fx.store.put(updated);
    discovers(&fx, "[\"org/a\"]");
    operator.scheduler().run_now(&id("renovate").key()).unwrap().await.unwrap();

    let job = fx.jobs.job(NS, &discovery_job_name("renovate")).unwrap();
    let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
    assert!(env.iter().any(|e| e.name == "RENOVATE_AUTODISCOVER_FILTER"));
}

#[tokio::test]
async fn start_discovery_refuses_while_a_job_runs() {
    let fx = Fixture::new();
    let target = resource("renovate", 1, &[]);
    fx.store.put(target.clone());
    fx.jobs.insert_job(build_discovery_job(&target, &JobSettings::default()));

    let err = operator(&fx).start_discovery(&id("renovate")).await.unwrap_err();

    assert_eq!(err, EngineError::DiscoveryAlreadyRunning(id("renovate")));
    assert!(fx.jobs.created().is_empty());
}

#[tokio::test]
async fn start_discovery_reconciles_in_the_background() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[("a", Completed), ("c", Scheduled)]));
    discovers(&fx, "[\"a\",\"b\"]");
    let operator = operator(&fx);

    let handle = operator.start_discovery(&id("renovate")).await.unwrap();
    assert_eq!(fx.jobs.created(), vec![discovery_job_name("renovate")]);
    handle.await.unwrap();

    assert_eq!(fx.statuses("renovate"), pairs(&[("a", Completed), ("b", Scheduled)]));
}

#[tokio::test]
async fn discovery_status_reads_missing_job_as_scheduled() {
    let fx = Fixture::new();
    let target = resource("renovate", 1, &[]);
    fx.store.put(target.clone());
    let operator = operator(&fx);

    assert_eq!(operator.discovery_status(&id("renovate")).await.unwrap(), Scheduled);

    fx.jobs.insert_job(build_discovery_job(&target, &JobSettings::default()));
    fx.jobs.set_counters(NS, &discovery_job_name("renovate"), 0, 1);
    assert_eq!(operator.discovery_status(&id("renovate")).await.unwrap(), Failed);
}

#[tokio::test]
async fn run_project_requeues_a_finished_project() {
    let fx = Fixture::new();
    fx.store.put(resource("renovate", 1, &[("a", Failed)]));

    operator(&fx).run_project(&id("renovate"), "a").await.unwrap();

    assert_eq!(fx.statuses("renovate"), pairs(&[("a", Scheduled)]));
}

#[tokio::test(start_paused = true)]
async fn healthy_once_scheduler_and_executor_run() {
    let fx = Fixture::new();
    let operator = operator(&fx);
    let cancel = CancellationToken::new();
    assert!(!operator.health().healthy);

    operator.start();
    let executor = operator.spawn_executor(cancel.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(operator.health().healthy);

    cancel.cancel();
    executor.await.unwrap();
    operator.stop();
    assert!(!operator.health().healthy);
}
