// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator facade
//!
//! Wires the status manager, discovery agent, executor and scheduler
//! together for the resource controller and manual triggers.

use crate::config::EngineConfig;
use crate::discovery::DiscoveryAgent;
use crate::error::EngineError;
use crate::executor::Executor;
use crate::health::{ApplicationHealth, Health};
use crate::scheduler::{Action, Scheduler};
use crate::status_manager::ProjectStatusManager;
use futures_util::FutureExt;
use parking_lot::Mutex;
use rop_adapters::{JobAdapter, RenovateJob, ResourceStore};
use rop_core::{Clock, JobPhase, ResourceId, Status, SystemClock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One discovery run of a resource: discover, then reconcile the result.
pub struct DiscoveryCycle<C: Clock = SystemClock> {
    manager: Arc<ProjectStatusManager<C>>,
    discovery: Arc<DiscoveryAgent>,
}

impl<C: Clock> Clone for DiscoveryCycle<C> {
    fn clone(&self) -> Self {
        Self { manager: Arc::clone(&self.manager), discovery: Arc::clone(&self.discovery) }
    }
}

impl<C: Clock> DiscoveryCycle<C> {
    /// Scheduled cycle: reload, discover, reconcile, then reschedule every
    /// project that is not running.
    pub async fn run(&self, id: &ResourceId) -> Result<Vec<String>, EngineError> {
        let resource = self.manager.get(id).await?;
        let projects = self.discovery.discover(&resource).await?;
        self.manager.reconcile(id, &projects).await?;
        self.manager.update_batched(id, |p| p.status != Status::Running, Status::Scheduled).await?;
        Ok(projects)
    }

    /// Wait for an already created discovery job and reconcile its result.
    async fn complete(&self, resource: &RenovateJob) -> Result<Vec<String>, EngineError> {
        let projects = self.discovery.wait_for_discovery_job(resource).await?;
        self.manager.reconcile(&resource.id(), &projects).await?;
        Ok(projects)
    }
}

/// Entry point of the orchestration core
pub struct Operator<C: Clock = SystemClock> {
    manager: Arc<ProjectStatusManager<C>>,
    discovery: Arc<DiscoveryAgent>,
    executor: Arc<Executor<C>>,
    scheduler: Scheduler<C>,
    health: Health<C>,
    cycle: DiscoveryCycle<C>,
    /// Resources with an installed schedule
    known: Mutex<HashSet<ResourceId>>,
    sync_interval: Duration,
}

impl<C: Clock> Operator<C> {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        jobs: Arc<dyn JobAdapter>,
        config: EngineConfig,
        clock: C,
        cancel: CancellationToken,
    ) -> Self {
        let health = Health::new(clock.clone());
        let manager = Arc::new(ProjectStatusManager::new(
            store,
            Arc::clone(&jobs),
            config.retry,
            clock.clone(),
        ));
        let discovery = Arc::new(DiscoveryAgent::new(Arc::clone(&jobs), &config, cancel));
        let executor = Arc::new(Executor::new(Arc::clone(&manager), jobs, health.clone(), &config));
        let cycle =
            DiscoveryCycle { manager: Arc::clone(&manager), discovery: Arc::clone(&discovery) };
        Self {
            manager,
            discovery,
            executor,
            scheduler: Scheduler::new(health.clone(), clock),
            health,
            cycle,
            known: Mutex::new(HashSet::new()),
            sync_interval: config.sync_interval,
        }
    }

    pub fn manager(&self) -> &Arc<ProjectStatusManager<C>> {
        &self.manager
    }

    pub fn discovery(&self) -> &Arc<DiscoveryAgent> {
        &self.discovery
    }

    pub fn executor(&self) -> &Arc<Executor<C>> {
        &self.executor
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    /// Bring the schedule of `id` in line with the stored resource.
    ///
    /// A deleted resource is forgotten.
    pub async fn reconcile(&self, id: &ResourceId) -> Result<(), EngineError> {
        let resource = match self.manager.get(id).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                self.forget(id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.scheduler.install(&resource.spec.schedule, &id.key(), self.cycle_action(id))?;
        self.known.lock().insert(id.clone());
        Ok(())
    }

    /// Drop the schedule, locks and health state of `id`.
    pub fn forget(&self, id: &ResourceId) {
        self.scheduler.remove(&id.key());
        self.discovery.forget(id);
        self.executor.forget(id);
        if self.known.lock().remove(id) {
            tracing::info!(resource = %id, "forgot resource");
        }
    }

    /// Reconcile every declared resource and forget the ones that are gone.
    pub async fn sync_all(&self) -> Result<(), EngineError> {
        let ids = self.manager.list().await?;
        let live: HashSet<&ResourceId> = ids.iter().collect();
        let vanished: Vec<ResourceId> =
            self.known.lock().iter().filter(|id| !live.contains(id)).cloned().collect();
        for id in &vanished {
            self.forget(id);
        }
        for id in &ids {
            if let Err(e) = self.reconcile(id).await {
                tracing::warn!(resource = %id, error = %e, "reconcile failed");
            }
        }
        Ok(())
    }

    /// Run [`Operator::sync_all`] every sync interval until `cancel` fires.
    pub async fn sync_loop(&self, cancel: CancellationToken) {
        loop {
            if let Err(e) = self.sync_all().await {
                tracing::warn!(error = %e, "resource sync failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.sync_interval) => {}
            }
        }
    }

    /// Start a discovery run now.
    ///
    /// The job is created before returning; waiting for it and reconciling
    /// its result continue on the returned task.
    pub async fn start_discovery(&self, id: &ResourceId) -> Result<JoinHandle<()>, EngineError> {
        let resource = self.manager.get(id).await?;
        match self.discovery.discovery_job_status(&resource).await {
            Ok(JobPhase::Running) => return Err(EngineError::DiscoveryAlreadyRunning(id.clone())),
            Ok(_) | Err(EngineError::DiscoveryJobNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.discovery.create_discovery_job(&resource).await?;

        let cycle = self.cycle.clone();
        Ok(tokio::spawn(async move {
            if let Err(e) = cycle.complete(&resource).await {
                tracing::error!(resource = %resource.id(), error = %e, "discovery failed");
            }
        }))
    }

    /// Discovery state of `id` as shown to users; no job yet reads as scheduled.
    pub async fn discovery_status(&self, id: &ResourceId) -> Result<Status, EngineError> {
        let resource = self.manager.get(id).await?;
        match self.discovery.discovery_job_status(&resource).await {
            Ok(phase) => Ok(phase.into()),
            Err(EngineError::DiscoveryJobNotFound(_)) => Ok(Status::Scheduled),
            Err(e) => Err(e),
        }
    }

    /// Queue a project for its next run.
    pub async fn run_project(&self, id: &ResourceId, project: &str) -> Result<(), EngineError> {
        self.manager.update_one(id, project, Status::Scheduled).await?;
        Ok(())
    }

    pub fn health(&self) -> ApplicationHealth {
        self.health.snapshot()
    }

    /// Start firing schedules.
    pub fn start(&self) {
        self.scheduler.start();
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Run the executor loop on its own task.
    pub fn spawn_executor(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move { executor.run(cancel).await })
    }

    fn cycle_action(&self, id: &ResourceId) -> Action {
        let cycle = self.cycle.clone();
        let id = id.clone();
        Arc::new(move || {
            let (cycle, id) = (cycle.clone(), id.clone());
            async move {
                if let Err(e) = cycle.run(&id).await {
                    tracing::error!(resource = %id, error = %e, "discovery cycle failed");
                }
            }
            .boxed()
        })
    }
}

#[cfg(test)]
#[path = "operator_tests.rs"]
mod tests;
