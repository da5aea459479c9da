// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compute-job adapter: create, inspect and delete `batch/v1` Jobs and read
//! the logs of their pods.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use rop_core::{JobPhase, Transient};
use thiserror::Error;

/// Label the job controller puts on every pod it creates.
pub const JOB_NAME_POD_LABEL: &str = "job-name";

/// Errors from job adapter operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("api error ({code}): {message}")]
    Api { code: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
}

impl Transient for JobError {
    fn is_transient(&self) -> bool {
        match self {
            JobError::Transport(_) => true,
            // 409 covers a create racing the previous job's deletion
            JobError::Api { code, .. } => *code == 409 || *code == 429 || *code >= 500,
            JobError::NotFound(_) => false,
        }
    }
}

/// Adapter for running one-shot Jobs on the cluster
#[async_trait]
pub trait JobAdapter: Send + Sync + 'static {
    /// Stored copy of a job, `None` when absent.
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, JobError>;

    /// Submit a job; its namespace is taken from the job metadata.
    async fn create_job(&self, job: &Job) -> Result<(), JobError>;

    /// Delete a job and, in the background, its pods. Absent jobs are not an error.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), JobError>;

    /// Pods created for a job (matched by the `job-name` label).
    async fn list_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<Pod>, JobError>;

    /// Full log of a pod's first container.
    async fn pod_logs(&self, namespace: &str, pod_name: &str) -> Result<String, JobError>;
}

/// Phase of an executor job, read from its condition list.
///
/// `Complete=True` wins over `Failed=True`; neither means still running.
pub fn phase_from_conditions(job: &Job) -> JobPhase {
    let conditions = job.status.as_ref().and_then(|s| s.conditions.as_ref());
    let is_true = |kind: &str| {
        conditions.into_iter().flatten().any(|c| c.type_ == kind && c.status == "True")
    };
    if is_true("Complete") {
        JobPhase::Completed
    } else if is_true("Failed") {
        JobPhase::Failed
    } else {
        JobPhase::Running
    }
}

/// Phase of a discovery job, read from its pod counters.
///
/// Any failed pod wins over succeeded ones.
pub fn phase_from_counters(job: &Job) -> JobPhase {
    let status = job.status.as_ref();
    let failed = status.and_then(|s| s.failed).unwrap_or(0);
    let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);
    if failed > 0 {
        JobPhase::Failed
    } else if succeeded > 0 {
        JobPhase::Completed
    } else {
        JobPhase::Running
    }
}

/// Whether a pod finished successfully.
pub fn pod_succeeded(pod: &Pod) -> bool {
    pod.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Succeeded")
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{JobAdapter, JobError, JOB_NAME_POD_LABEL};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
    use k8s_openapi::api::core::v1::{Pod, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use kube::ResourceExt;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    type Key = (String, String);

    fn key(namespace: &str, name: &str) -> Key {
        (namespace.to_string(), name.to_string())
    }

    /// Recorded job adapter call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum JobCall {
        Get(String),
        Create(String),
        Delete(String),
        ListPods(String),
        Logs(String),
    }

    /// What happens to a job right after it is created.
    #[derive(Debug, Clone)]
    pub enum JobOutcome {
        /// One pod succeeds and prints `logs`
        Succeed { logs: String },
        /// One pod fails
        Fail,
    }

    #[derive(Default)]
    struct FakeJobState {
        jobs: BTreeMap<Key, Job>,
        pods: BTreeMap<Key, Vec<Pod>>,
        logs: BTreeMap<Key, String>,
        outcomes: BTreeMap<Key, JobOutcome>,
        create_failures: VecDeque<JobError>,
        calls: Vec<JobCall>,
        ticks: i64,
    }

    impl FakeJobState {
        /// Strictly increasing timestamps so newer pods sort later.
        fn tick(&mut self) -> DateTime<Utc> {
            self.ticks += 1;
            DateTime::from_timestamp(1_767_225_600 + self.ticks, 0).unwrap_or_default()
        }

        fn add_pod(&mut self, namespace: &str, job_name: &str, succeeded: bool, logs: &str) {
            let stamp = Time(self.tick());
            let pods = self.pods.entry(key(namespace, job_name)).or_default();
            let pod_name = format!("{}-{}", job_name, pods.len());
            pods.push(Pod {
                metadata: ObjectMeta {
                    name: Some(pod_name.clone()),
                    namespace: Some(namespace.to_string()),
                    labels: Some([(JOB_NAME_POD_LABEL.to_string(), job_name.to_string())].into()),
                    creation_timestamp: Some(stamp.clone()),
                    ..Default::default()
                },
                status: Some(PodStatus {
                    phase: Some(if succeeded { "Succeeded" } else { "Failed" }.to_string()),
                    start_time: Some(stamp),
                    ..Default::default()
                }),
                ..Default::default()
            });
            self.logs.insert(key(namespace, &pod_name), logs.to_string());
        }

        fn job_mut(&mut self, namespace: &str, name: &str) -> Option<&mut JobStatus> {
            let job = self.jobs.get_mut(&key(namespace, name))?;
            Some(job.status.get_or_insert_with(JobStatus::default))
        }
    }

    /// In-memory job runner with scripted outcomes and recorded calls.
    #[derive(Clone, Default)]
    pub struct FakeJobAdapter {
        inner: Arc<Mutex<FakeJobState>>,
    }

    impl FakeJobAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Apply `outcome` to every job created under this name from now on.
        pub fn on_create(&self, namespace: &str, name: &str, outcome: JobOutcome) {
            self.inner.lock().outcomes.insert(key(namespace, name), outcome);
        }

        /// Fail the next creates with these errors, in order.
        pub fn fail_creates(&self, errors: impl IntoIterator<Item = JobError>) {
            self.inner.lock().create_failures.extend(errors);
        }

        /// Store a job directly, bypassing `create_job`.
        pub fn insert_job(&self, job: Job) {
            let namespace = job.namespace().unwrap_or_default();
            self.inner.lock().jobs.insert(key(&namespace, &job.name_any()), job);
        }

        pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
            self.inner.lock().jobs.get(&key(namespace, name)).cloned()
        }

        /// Names of stored jobs, sorted.
        pub fn job_names(&self) -> Vec<String> {
            self.inner.lock().jobs.keys().map(|(_, name)| name.clone()).collect()
        }

        /// Add a `type=True` condition (`Complete` or `Failed`).
        pub fn set_condition(&self, namespace: &str, name: &str, type_: &str) {
            if let Some(status) = self.inner.lock().job_mut(namespace, name) {
                status.conditions.get_or_insert_with(Vec::new).push(JobCondition {
                    type_: type_.to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                });
            }
        }

        /// Set the succeeded/failed pod counters.
        pub fn set_counters(&self, namespace: &str, name: &str, succeeded: i32, failed: i32) {
            if let Some(status) = self.inner.lock().job_mut(namespace, name) {
                status.succeeded = Some(succeeded);
                status.failed = Some(failed);
            }
        }

        /// Record a finished pod for a job, with its log.
        pub fn add_pod(&self, namespace: &str, job_name: &str, succeeded: bool, logs: &str) {
            self.inner.lock().add_pod(namespace, job_name, succeeded, logs);
        }

        pub fn calls(&self) -> Vec<JobCall> {
            self.inner.lock().calls.clone()
        }

        pub fn created(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    JobCall::Create(name) => Some(name),
                    _ => None,
                })
                .collect()
        }

        pub fn deleted(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    JobCall::Delete(name) => Some(name),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl JobAdapter for FakeJobAdapter {
        async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, JobError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Get(name.to_string()));
            Ok(state.jobs.get(&key(namespace, name)).cloned())
        }

        async fn create_job(&self, job: &Job) -> Result<(), JobError> {
            let namespace = job.namespace().unwrap_or_default();
            let name = job.name_any();
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Create(name.clone()));
            if let Some(err) = state.create_failures.pop_front() {
                return Err(err);
            }
            if state.jobs.contains_key(&key(&namespace, &name)) {
                return Err(JobError::Api { code: 409, message: format!("{} already exists", name) });
            }
            let mut stored = job.clone();
            stored.metadata.uid = Some(format!("uid-{}", name));
            stored.status = Some(JobStatus::default());
            state.jobs.insert(key(&namespace, &name), stored);

            match state.outcomes.get(&key(&namespace, &name)).cloned() {
                Some(JobOutcome::Succeed { logs }) => {
                    state.add_pod(&namespace, &name, true, &logs);
                    if let Some(status) = state.job_mut(&namespace, &name) {
                        status.succeeded = Some(1);
                    }
                }
                Some(JobOutcome::Fail) => {
                    state.add_pod(&namespace, &name, false, "");
                    if let Some(status) = state.job_mut(&namespace, &name) {
                        status.failed = Some(1);
                    }
                }
                None => {}
            }
            Ok(())
        }

        async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), JobError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Delete(name.to_string()));
            state.jobs.remove(&key(namespace, name));
            if let Some(pods) = state.pods.remove(&key(namespace, name)) {
                for pod in pods {
                    state.logs.remove(&key(namespace, &pod.name_any()));
                }
            }
            Ok(())
        }

        async fn list_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<Pod>, JobError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::ListPods(job_name.to_string()));
            Ok(state.pods.get(&key(namespace, job_name)).cloned().unwrap_or_default())
        }

        async fn pod_logs(&self, namespace: &str, pod_name: &str) -> Result<String, JobError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Logs(pod_name.to_string()));
            state
                .logs
                .get(&key(namespace, pod_name))
                .cloned()
                .ok_or_else(|| JobError::NotFound(format!("pod {}", pod_name)))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobAdapter, JobCall, JobOutcome};

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
