// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project executor
//!
//! A background loop that sweeps every declared resource: running projects
//! whose job has landed get their result, and scheduled projects are started
//! while the resource's parallelism allows.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::health::Health;
use crate::locks::KeyedLocks;
use crate::status_manager::ProjectStatusManager;
use rop_adapters::{build_executor_job, phase_from_conditions, JobAdapter, JobSettings, RenovateJob};
use rop_core::{executor_job_name, retry, Clock, JobPhase, ResourceId, RetryPolicy, Status, SystemClock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Result of one sweep attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Another sweep of the same resource holds the lock
    Skipped,
    Swept { started: usize, finished: usize },
}

/// Starts executor jobs and collects their results
pub struct Executor<C: Clock = SystemClock> {
    manager: Arc<ProjectStatusManager<C>>,
    jobs: Arc<dyn JobAdapter>,
    locks: KeyedLocks<Mutex<()>>,
    health: Health<C>,
    settings: JobSettings,
    retry: RetryPolicy,
    interval: Duration,
    delete_successful_jobs: bool,
}

impl<C: Clock> Executor<C> {
    pub fn new(
        manager: Arc<ProjectStatusManager<C>>,
        jobs: Arc<dyn JobAdapter>,
        health: Health<C>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            manager,
            jobs,
            locks: KeyedLocks::new(),
            health,
            settings: config.jobs,
            retry: config.retry,
            interval: config.executor_interval,
            delete_successful_jobs: config.delete_successful_jobs,
        }
    }

    /// Sweep all resources every interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        self.health.set_executor_running(true);
        tracing::info!(interval = ?self.interval, "executor started");
        loop {
            self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        self.health.set_executor_running(false);
        tracing::info!("executor stopped");
    }

    /// One pass over every declared resource.
    ///
    /// Failures are logged per resource and never abort the pass.
    pub async fn tick(&self) {
        let ids = match self.manager.list().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "listing resources failed");
                return;
            }
        };

        let live: HashSet<String> = ids.iter().map(ResourceId::key).collect();
        self.locks.retain(&live);
        self.health.retain_sweeps(&live);

        tracing::debug!(count = ids.len(), "sweeping resources");
        for id in &ids {
            if let Err(e) = self.sweep(id).await {
                tracing::error!(resource = %id, error = %e, "sweep failed");
            }
        }
    }

    /// Sweep one resource, unless a sweep of it is already in progress.
    pub async fn sweep(&self, id: &ResourceId) -> Result<SweepOutcome, EngineError> {
        let key = id.key();
        let lock = self.locks.get(&key);
        let Ok(_guard) = lock.try_lock() else {
            tracing::info!(resource = %id, "previous sweep still running, skipping");
            return Ok(SweepOutcome::Skipped);
        };
        let _sweeping = Sweeping::start(&self.health, &key);

        let resource = self.manager.get(id).await?;
        self.sweep_projects(&resource).await
    }

    /// Drop the lock and health entry of a resource that no longer exists.
    pub fn forget(&self, id: &ResourceId) {
        let key = id.key();
        if self.locks.evict(&key) {
            self.health.sweep_removed(&key);
        }
    }

    async fn sweep_projects(&self, resource: &RenovateJob) -> Result<SweepOutcome, EngineError> {
        let id = resource.id();
        let parallelism = usize::try_from(resource.spec.parallelism).unwrap_or(0);
        let mut running = resource.running_count();
        let (mut started, mut finished) = (0, 0);

        for project in resource.projects() {
            match project.status {
                Status::Completed | Status::Failed => {}
                Status::Running => {
                    let job = executor_job_name(&id.name, &project.name);
                    let phase = self.job_phase(&id.namespace, &job).await?;
                    if phase == JobPhase::Running {
                        continue;
                    }
                    let status = Status::from(phase);
                    self.manager.update_one(&id, &project.name, status).await?;
                    running = running.saturating_sub(1);
                    finished += 1;
                    tracing::info!(resource = %id, project = %project.name, %status, "project finished");

                    if status == Status::Completed && self.delete_successful_jobs {
                        self.jobs.delete_job(&id.namespace, &job).await?;
                    }
                }
                Status::Scheduled if running < parallelism => {
                    self.start_job(resource, &project.name).await?;
                    running += 1;
                    started += 1;
                    self.manager.update_one(&id, &project.name, Status::Running).await?;
                    tracing::info!(resource = %id, project = %project.name, "project started");
                }
                Status::Scheduled => {}
            }
        }

        Ok(SweepOutcome::Swept { started, finished })
    }

    /// Live phase of an executor job; a missing job counts as failed.
    async fn job_phase(&self, namespace: &str, job: &str) -> Result<JobPhase, EngineError> {
        Ok(match self.jobs.get_job(namespace, job).await? {
            Some(job) => phase_from_conditions(&job),
            None => {
                tracing::warn!(namespace, job, "executor job vanished");
                JobPhase::Failed
            }
        })
    }

    /// Replace any stale job of the same name and submit a fresh one.
    async fn start_job(&self, resource: &RenovateJob, project: &str) -> Result<(), EngineError> {
        let id = resource.id();
        let job = build_executor_job(resource, project, &self.settings);
        let name = executor_job_name(&id.name, project);
        let (jobs, job, namespace, name) = (&self.jobs, &job, id.namespace.as_str(), name.as_str());
        retry(self.retry, || async move {
            jobs.delete_job(namespace, name).await?;
            jobs.create_job(job).await
        })
        .await?;
        Ok(())
    }
}

/// Marks a resource as being swept until dropped.
struct Sweeping<'a, C: Clock> {
    health: &'a Health<C>,
    key: &'a str,
}

impl<'a, C: Clock> Sweeping<'a, C> {
    fn start(health: &'a Health<C>, key: &'a str) -> Self {
        health.sweep_started(key);
        Self { health, key }
    }
}

impl<C: Clock> Drop for Sweeping<'_, C> {
    fn drop(&mut self) {
        self.health.sweep_finished(self.key);
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
