// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kube`-backed implementation of [`ResourceStore`] and [`JobAdapter`].

use crate::crd::RenovateJob;
use crate::jobs::{JobAdapter, JobError, JOB_NAME_POD_LABEL};
use crate::store::{ResourceStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, LogParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use rop_core::ResourceId;
use serde_json::json;

/// Adapter talking to the Kubernetes API server.
///
/// Cheap to clone; every clone shares the underlying client.
#[derive(Clone)]
pub struct KubeAdapter {
    client: Client,
}

impl KubeAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn resources(&self, namespace: &str) -> Api<RenovateJob> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn store_error(e: kube::Error, what: impl std::fmt::Display) -> StoreError {
    match e {
        kube::Error::Api(resp) if resp.code == 404 => StoreError::NotFound(what.to_string()),
        kube::Error::Api(resp) if resp.code == 409 => StoreError::Conflict(what.to_string()),
        kube::Error::Api(resp) => StoreError::Api { code: resp.code, message: resp.message },
        kube::Error::SerdeError(e) => StoreError::Serialization(e.to_string()),
        other => StoreError::Transport(other.to_string()),
    }
}

fn job_error(e: kube::Error, what: &str) -> JobError {
    match e {
        kube::Error::Api(resp) if resp.code == 404 => JobError::NotFound(what.to_string()),
        kube::Error::Api(resp) => JobError::Api { code: resp.code, message: resp.message },
        other => JobError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ResourceStore for KubeAdapter {
    async fn list(&self) -> Result<Vec<ResourceId>, StoreError> {
        let api: Api<RenovateJob> = Api::all(self.client.clone());
        let list =
            api.list(&ListParams::default()).await.map_err(|e| store_error(e, "renovatejobs"))?;
        Ok(list.items.iter().map(RenovateJob::id).collect())
    }

    async fn get(&self, id: &ResourceId) -> Result<RenovateJob, StoreError> {
        self.resources(&id.namespace).get(&id.name).await.map_err(|e| store_error(e, id))
    }

    async fn update_status(&self, resource: &RenovateJob) -> Result<(), StoreError> {
        let id = resource.id();
        // Carrying the resource version makes the API server reject stale writes
        let patch = json!({
            "metadata": { "resourceVersion": resource.resource_version() },
            "status": resource.status,
        });
        self.resources(&id.namespace)
            .patch_status(&id.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(e, &id))?;
        tracing::debug!(resource = %id, "status updated");
        Ok(())
    }
}

#[async_trait]
impl JobAdapter for KubeAdapter {
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, JobError> {
        self.jobs(namespace).get_opt(name).await.map_err(|e| job_error(e, name))
    }

    async fn create_job(&self, job: &Job) -> Result<(), JobError> {
        let name = job.name_any();
        let namespace = job.namespace().unwrap_or_default();
        tracing::info!(job = %name, %namespace, "creating job");
        self.jobs(&namespace)
            .create(&PostParams::default(), job)
            .await
            .map_err(|e| job_error(e, &name))?;
        Ok(())
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), JobError> {
        match self.jobs(namespace).delete(name, &DeleteParams::background()).await {
            Ok(_) => {
                tracing::info!(job = %name, %namespace, "deleted job");
                Ok(())
            }
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(e) => Err(job_error(e, name)),
        }
    }

    async fn list_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<Pod>, JobError> {
        let lp = ListParams::default().labels(&format!("{}={}", JOB_NAME_POD_LABEL, job_name));
        let pods = self.pods(namespace).list(&lp).await.map_err(|e| job_error(e, job_name))?;
        Ok(pods.items)
    }

    async fn pod_logs(&self, namespace: &str, pod_name: &str) -> Result<String, JobError> {
        self.pods(namespace)
            .logs(pod_name, &LogParams::default())
            .await
            .map_err(|e| job_error(e, pod_name))
    }
}
