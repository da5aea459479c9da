// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `RenovateJob` custom resource.
//!
//! The schema is owned by the cluster; this type mirrors it so the store can
//! read declarations and write the `status` sub-resource.

use k8s_openapi::api::core::v1::{
    Affinity, EnvVar, LocalObjectReference, PodSecurityContext, ResourceRequirements,
    SecurityContext, Toleration, TopologySpreadConstraint, Volume, VolumeMount,
};
use kube::{CustomResource, ResourceExt};
use rop_core::{ProjectStatus, ResourceId, Status};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared update schedule for a set of discovered projects.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, Serialize)]
#[kube(
    group = "renovate-operator.mogenius.com",
    version = "v1alpha1",
    kind = "RenovateJob",
    namespaced,
    status = "RenovateJobStatus",
    shortname = "rj"
)]
#[serde(rename_all = "camelCase")]
pub struct RenovateJobSpec {
    /// Cron expression for the discovery cycle
    pub schedule: String,

    /// Container image running renovate
    #[serde(default)]
    pub image: String,

    /// Value of `RENOVATE_AUTODISCOVER_FILTER` for discovery
    #[serde(default)]
    pub discovery_filter: String,

    /// Value of `RENOVATE_AUTODISCOVER_TOPICS` for discovery
    #[serde(default)]
    pub discover_topics: String,

    /// Secret exposed to every job through `envFrom`
    #[serde(default)]
    pub secret_ref: String,

    #[serde(default)]
    pub extra_env: Vec<EnvVar>,

    #[serde(default)]
    pub extra_volumes: Vec<Volume>,

    #[serde(default)]
    pub extra_volume_mounts: Vec<VolumeMount>,

    /// Ceiling on simultaneously running projects
    #[serde(default)]
    pub parallelism: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_spread_constraints: Option<Vec<TopologySpreadConstraint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secrets: Option<Vec<LocalObjectReference>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountSpec>,

    /// Labels and annotations stamped onto job pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PodMetadataSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContextSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automount_service_account_token: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMetadataSpec {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Overrides for the default non-root security contexts.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContextSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<PodSecurityContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<SecurityContext>,
}

/// Observed state: one record per discovered project.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenovateJobStatus {
    #[serde(default)]
    pub projects: Vec<ProjectStatus>,
}

impl RenovateJob {
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.name_any(), self.namespace().unwrap_or_default())
    }

    /// Project records in stored order (empty before the first discovery).
    pub fn projects(&self) -> &[ProjectStatus] {
        self.status.as_ref().map(|s| s.projects.as_slice()).unwrap_or_default()
    }

    /// Mutable project list, creating an empty status on first use.
    pub fn projects_mut(&mut self) -> &mut Vec<ProjectStatus> {
        &mut self.status.get_or_insert_with(RenovateJobStatus::default).projects
    }

    pub fn project(&self, name: &str) -> Option<&ProjectStatus> {
        self.projects().iter().find(|p| p.name == name)
    }

    /// Number of projects currently `Running`.
    pub fn running_count(&self) -> usize {
        self.projects().iter().filter(|p| p.status == Status::Running).count()
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod tests;
