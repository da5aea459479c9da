// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery agent
//!
//! Runs the one-shot discovery job of a resource and harvests the project
//! list it prints. Cycles of the same resource are serialized by a
//! per-resource lock; different resources discover concurrently.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locks::KeyedLocks;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use rop_adapters::{
    build_discovery_job, phase_from_counters, pod_succeeded, JobAdapter, JobSettings, RenovateJob,
};
use rop_core::{discovery_job_name, retry, JobPhase, ResourceId, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Creates, polls and reads discovery jobs
pub struct DiscoveryAgent {
    jobs: Arc<dyn JobAdapter>,
    locks: KeyedLocks<RwLock<()>>,
    settings: JobSettings,
    retry: RetryPolicy,
    poll: Duration,
    output_polls: u32,
    cancel: CancellationToken,
}

impl DiscoveryAgent {
    pub fn new(jobs: Arc<dyn JobAdapter>, config: &EngineConfig, cancel: CancellationToken) -> Self {
        Self {
            jobs,
            locks: KeyedLocks::new(),
            settings: config.jobs,
            retry: config.retry,
            poll: config.discovery_poll,
            output_polls: config.discovery_output_polls,
            cancel,
        }
    }

    /// Replace the resource's discovery job with a fresh one.
    ///
    /// Returns the job as stored by the cluster.
    pub async fn create_discovery_job(&self, resource: &RenovateJob) -> Result<Job, EngineError> {
        let id = resource.id();
        let lock = self.locks.get(&id.key());
        let _guard = lock.write().await;

        let job = build_discovery_job(resource, &self.settings);
        let name = job.name_any();
        tracing::info!(resource = %id, job = %name, "creating discovery job");

        let jobs = &self.jobs;
        let (job, namespace, job_name) = (&job, id.namespace.as_str(), name.as_str());
        retry(self.retry, || async move {
            jobs.delete_job(namespace, job_name).await?;
            jobs.create_job(job).await
        })
        .await?;

        self.jobs
            .get_job(&id.namespace, &name)
            .await?
            .ok_or(EngineError::DiscoveryJobNotFound(name))
    }

    /// Phase of the resource's discovery job, read from its pod counters.
    pub async fn discovery_job_status(&self, resource: &RenovateJob) -> Result<JobPhase, EngineError> {
        let id = resource.id();
        let lock = self.locks.get(&id.key());
        let _guard = lock.read().await;

        let name = discovery_job_name(&id.name);
        match self.jobs.get_job(&id.namespace, &name).await? {
            Some(job) => Ok(phase_from_counters(&job)),
            None => Err(EngineError::DiscoveryJobNotFound(name)),
        }
    }

    /// Poll the discovery job until it lands and return the discovered
    /// projects, sorted.
    pub async fn wait_for_discovery_job(
        &self,
        resource: &RenovateJob,
    ) -> Result<Vec<String>, EngineError> {
        let id = resource.id();
        let name = discovery_job_name(&id.name);
        let mut output_polls = 0;
        loop {
            match self.discovery_job_status(resource).await? {
                JobPhase::Failed => return Err(EngineError::DiscoveryFailed(name)),
                JobPhase::Completed => match self.read_output(&id, &name).await? {
                    Some(projects) => {
                        tracing::info!(resource = %id, count = projects.len(), "discovery finished");
                        return Ok(projects);
                    }
                    None if output_polls >= self.output_polls => {
                        return Err(EngineError::DiscoveryOutput {
                            job: name,
                            reason: "no succeeded pod".to_string(),
                        });
                    }
                    None => output_polls += 1,
                },
                JobPhase::Running => {}
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
                _ = tokio::time::sleep(self.poll) => {}
            }
        }
    }

    /// Create the discovery job and wait for its result.
    pub async fn discover(&self, resource: &RenovateJob) -> Result<Vec<String>, EngineError> {
        self.create_discovery_job(resource).await?;
        self.wait_for_discovery_job(resource).await
    }

    /// Drop the lock of a resource that no longer exists.
    pub fn forget(&self, id: &ResourceId) {
        if !self.locks.evict(&id.key()) {
            tracing::debug!(resource = %id, "discovery lock busy, kept");
        }
    }

    /// Output of the newest succeeded pod, `None` while no pod has succeeded.
    async fn read_output(
        &self,
        id: &ResourceId,
        job: &str,
    ) -> Result<Option<Vec<String>>, EngineError> {
        let pods = self.jobs.list_pods(&id.namespace, job).await?;
        let Some(pod) = pods.iter().filter(|p| pod_succeeded(p)).max_by_key(|p| started_at(p))
        else {
            return Ok(None);
        };
        let logs = self.jobs.pod_logs(&id.namespace, &pod.name_any()).await?;
        parse_output(job, &logs).map(Some)
    }
}

fn started_at(pod: &Pod) -> Option<chrono::DateTime<chrono::Utc>> {
    pod.status.as_ref().and_then(|s| s.start_time.as_ref()).map(|t| t.0)
}

/// Parse discovery output: a non-empty JSON array of project names.
fn parse_output(job: &str, logs: &str) -> Result<Vec<String>, EngineError> {
    let invalid = |reason: String| EngineError::DiscoveryOutput { job: job.to_string(), reason };
    let mut projects: Vec<String> =
        serde_json::from_str(logs.trim()).map_err(|e| invalid(e.to_string()))?;
    if projects.is_empty() {
        return Err(invalid("no projects discovered".to_string()));
    }
    projects.sort();
    Ok(projects)
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
