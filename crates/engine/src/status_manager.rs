// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project status manager
//!
//! Sole reader and writer of a resource's persisted project list. Reads run
//! concurrently; writes are serialized across all resources by one manager
//! lock. Every write is a `load → mutate → update status → reload` unit that
//! is retried as a whole, so a conflicting writer is absorbed by reloading
//! before the next attempt.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use rop_adapters::{JobAdapter, RenovateJob, ResourceStore};
use rop_core::{
    executor_job_name, has_issues, retry, Clock, ProjectStatus, ResourceId, RetryPolicy, Status,
    SystemClock,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reads and writes project statuses of declared resources
pub struct ProjectStatusManager<C: Clock = SystemClock> {
    store: Arc<dyn ResourceStore>,
    jobs: Arc<dyn JobAdapter>,
    lock: RwLock<()>,
    retry: RetryPolicy,
    clock: C,
}

impl<C: Clock> ProjectStatusManager<C> {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        jobs: Arc<dyn JobAdapter>,
        retry: RetryPolicy,
        clock: C,
    ) -> Self {
        Self { store, jobs, lock: RwLock::new(()), retry, clock }
    }

    /// Every declared resource.
    pub async fn list(&self) -> Result<Vec<ResourceId>, EngineError> {
        let _guard = self.lock.read().await;
        Ok(self.store.list().await?)
    }

    /// One resource, [`EngineError::ResourceNotFound`] when absent.
    pub async fn get(&self, id: &ResourceId) -> Result<RenovateJob, EngineError> {
        let _guard = self.lock.read().await;
        self.store.get(id).await.map_err(|e| EngineError::from_store(e, id))
    }

    pub async fn projects_for(&self, id: &ResourceId) -> Result<Vec<ProjectStatus>, EngineError> {
        Ok(self.get(id).await?.projects().to_vec())
    }

    pub async fn projects_by_status(
        &self,
        id: &ResourceId,
        status: Status,
    ) -> Result<Vec<ProjectStatus>, EngineError> {
        let mut projects = self.projects_for(id).await?;
        projects.retain(|p| p.status == status);
        Ok(projects)
    }

    /// Request `desired` for one project.
    ///
    /// An unknown project is seeded as `Scheduled` and advanced when the
    /// request is `Scheduled` or `Running`; a result reported for an unknown
    /// project is dropped.
    pub async fn update_one(
        &self,
        id: &ResourceId,
        project: &str,
        desired: Status,
    ) -> Result<RenovateJob, EngineError> {
        self.write(id, |resource, now| {
            let projects = resource.projects_mut();
            match projects.iter().position(|p| p.name == project) {
                Some(i) => projects[i].apply(desired, now),
                None if matches!(desired, Status::Scheduled | Status::Running) => {
                    let mut record = ProjectStatus::scheduled(project, now);
                    record.apply(desired, now);
                    projects.push(record);
                    true
                }
                None => {
                    tracing::warn!(resource = %id, project, %desired, "result for unknown project dropped");
                    false
                }
            }
        })
        .await
    }

    /// Request `desired` for every project matching `predicate`, persisted once.
    pub async fn update_batched<P>(
        &self,
        id: &ResourceId,
        predicate: P,
        desired: Status,
    ) -> Result<RenovateJob, EngineError>
    where
        P: Fn(&ProjectStatus) -> bool + Sync,
    {
        self.write(id, |resource, now| {
            let mut changed = false;
            for record in resource.projects_mut().iter_mut().filter(|p| predicate(p)) {
                changed |= record.apply(desired, now);
            }
            changed
        })
        .await
    }

    /// Replace the project list with `discovered`.
    ///
    /// Known names keep their record, new names start `Scheduled`, and names
    /// missing from `discovered` are dropped. Order follows `discovered`;
    /// duplicates collapse onto their first occurrence.
    pub async fn reconcile(
        &self,
        id: &ResourceId,
        discovered: &[String],
    ) -> Result<RenovateJob, EngineError> {
        self.write(id, |resource, now| {
            let mut seen = HashSet::new();
            let next: Vec<ProjectStatus> = discovered
                .iter()
                .filter(|name| seen.insert(name.as_str()))
                .map(|name| {
                    resource
                        .project(name)
                        .cloned()
                        .unwrap_or_else(|| ProjectStatus::scheduled(name.as_str(), now))
                })
                .collect();
            if next.as_slice() == resource.projects() {
                return false;
            }
            *resource.projects_mut() = next;
            true
        })
        .await
    }

    /// Log of the newest pod of a project's executor job.
    pub async fn logs_for(&self, id: &ResourceId, project: &str) -> Result<String, EngineError> {
        let job = executor_job_name(&id.name, project);
        let pods = self.jobs.list_pods(&id.namespace, &job).await?;
        let newest = pods
            .iter()
            .max_by_key(|pod| pod.metadata.creation_timestamp.as_ref().map(|t| t.0))
            .ok_or_else(|| EngineError::NoPods(job.clone()))?;
        Ok(self.jobs.pod_logs(&id.namespace, &newest.name_any()).await?)
    }

    /// Whether the project's last run logged a warning or an error.
    pub async fn issues_for(&self, id: &ResourceId, project: &str) -> Result<bool, EngineError> {
        Ok(has_issues(&self.logs_for(id, project).await?))
    }

    /// Run one retried write unit under the manager lock.
    ///
    /// `mutate` returns whether it changed anything; unchanged resources are
    /// not persisted. Returns the reloaded resource.
    async fn write<F>(&self, id: &ResourceId, mutate: F) -> Result<RenovateJob, EngineError>
    where
        F: Fn(&mut RenovateJob, DateTime<Utc>) -> bool + Sync,
    {
        let _guard = self.lock.write().await;
        let store = &self.store;
        let clock = &self.clock;
        let mutate = &mutate;
        retry(self.retry, || async move {
            let mut resource = store.get(id).await?;
            if !mutate(&mut resource, clock.now()) {
                return Ok(resource);
            }
            store.update_status(&resource).await?;
            store.get(id).await
        })
        .await
        .map_err(|e| EngineError::from_store(e, id))
    }
}

#[cfg(test)]
#[path = "status_manager_tests.rs"]
mod tests;
