// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job spec construction for discovery and executor runs.

use crate::crd::{RenovateJob, RenovateJobSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvFromSource, EnvVar, PodSecurityContext, PodSpec,
    PodTemplateSpec, SeccompProfile, SecretEnvSource, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use rop_core::{discovery_job_name, executor_job_name};
use std::collections::BTreeMap;

pub const JOB_TYPE_LABEL: &str = "renovate-operator.mogenius.com/job-type";
pub const JOB_NAME_LABEL: &str = "renovate-operator.mogenius.com/job-name";

/// UID/GID of the default non-root security contexts.
const RENOVATE_UID: i64 = 12021;

const DISCOVERY_SCRIPT: &str = "renovate --autodiscover --write-discovered-repos /tmp/repos.json \
     >> /tmp/logs.json && cat /tmp/repos.json || cat /tmp/logs.json";

/// Operator-wide job limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub active_deadline_seconds: i64,
    pub backoff_limit: i32,
    /// Applied to executor jobs only
    pub ttl_seconds_after_finished: Option<i32>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self { active_deadline_seconds: 1800, backoff_limit: 1, ttl_seconds_after_finished: None }
    }
}

impl JobSettings {
    rop_core::setters! {
        set {
            active_deadline_seconds: i64,
            backoff_limit: i32,
            ttl_seconds_after_finished: Option<i32>,
        }
    }
}

/// Which of the two job kinds is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Discovery,
    Executor,
}

rop_core::simple_display! {
    JobKind {
        Discovery => "discovery",
        Executor => "executor",
    }
}

/// One-shot job that lists the projects of `resource` on stdout.
pub fn build_discovery_job(resource: &RenovateJob, settings: &JobSettings) -> Job {
    let spec = &resource.spec;
    let mut env = vec![env_var("LOG_FORMAT", "json"), env_var("NODE_NO_WARNINGS", "1")];
    if !spec.discovery_filter.is_empty() {
        env.push(env_var("RENOVATE_AUTODISCOVER_FILTER", &spec.discovery_filter));
    }
    if !spec.discover_topics.is_empty() {
        env.push(env_var("RENOVATE_AUTODISCOVER_TOPICS", &spec.discover_topics));
    }

    let container = Container {
        name: "discovery".to_string(),
        command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
        args: Some(vec![DISCOVERY_SCRIPT.to_string()]),
        ..base_container(spec, env)
    };
    build_job(resource, JobKind::Discovery, discovery_job_name(&resource.name_any()), container, settings)
}

/// Job that runs renovate against a single project.
pub fn build_executor_job(resource: &RenovateJob, project: &str, settings: &JobSettings) -> Job {
    let spec = &resource.spec;
    let container = Container {
        name: "renovate".to_string(),
        command: Some(vec!["renovate".to_string()]),
        args: Some(vec!["--base-dir".to_string(), "/tmp".to_string(), project.to_string()]),
        ..base_container(spec, vec![env_var("LOG_FORMAT", "json")])
    };
    let name = executor_job_name(&resource.name_any(), project);
    let mut job = build_job(resource, JobKind::Executor, name, container, settings);
    if let Some(job_spec) = job.spec.as_mut() {
        job_spec.ttl_seconds_after_finished = settings.ttl_seconds_after_finished;
    }
    job
}

fn build_job(
    resource: &RenovateJob,
    kind: JobKind,
    name: String,
    container: Container,
    settings: &JobSettings,
) -> Job {
    let spec = &resource.spec;

    let mut volumes = vec![Volume {
        name: "tmp".to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }];
    volumes.extend(spec.extra_volumes.iter().cloned());

    let mut labels = BTreeMap::from([
        (JOB_TYPE_LABEL.to_string(), kind.to_string()),
        (JOB_NAME_LABEL.to_string(), name.clone()),
    ]);
    let annotations = spec.metadata.as_ref().map(|m| {
        labels.extend(m.labels.clone());
        m.annotations.clone()
    });

    let service_account = spec.service_account.as_ref();
    let pod_spec = PodSpec {
        service_account_name: service_account.map(|sa| sa.name.clone()).filter(|n| !n.is_empty()),
        automount_service_account_token: Some(
            service_account.and_then(|sa| sa.automount_service_account_token).unwrap_or(false),
        ),
        image_pull_secrets: spec.image_pull_secrets.clone(),
        termination_grace_period_seconds: Some(0),
        containers: vec![container],
        security_context: Some(pod_security_context(spec)),
        restart_policy: Some("OnFailure".to_string()),
        node_selector: spec.node_selector.clone(),
        affinity: spec.affinity.clone(),
        tolerations: spec.tolerations.clone(),
        topology_spread_constraints: spec.topology_spread_constraints.clone(),
        volumes: Some(volumes),
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: resource.namespace(),
            owner_references: resource.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: Some(JobSpec {
            active_deadline_seconds: Some(settings.active_deadline_seconds),
            backoff_limit: Some(settings.backoff_limit),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations,
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Container fields shared by both job kinds; `env` comes first so user
/// entries can override it.
fn base_container(spec: &RenovateJobSpec, mut env: Vec<EnvVar>) -> Container {
    env.extend(spec.extra_env.iter().cloned());

    let mut volume_mounts =
        vec![VolumeMount { name: "tmp".to_string(), mount_path: "/tmp".to_string(), ..Default::default() }];
    volume_mounts.extend(spec.extra_volume_mounts.iter().cloned());

    let env_from = (!spec.secret_ref.is_empty()).then(|| {
        vec![EnvFromSource {
            secret_ref: Some(SecretEnvSource { name: spec.secret_ref.clone(), optional: None }),
            ..Default::default()
        }]
    });

    Container {
        image: Some(spec.image.clone()),
        env: Some(env),
        env_from,
        resources: spec.resources.clone(),
        volume_mounts: Some(volume_mounts),
        security_context: Some(container_security_context(spec)),
        ..Default::default()
    }
}

fn pod_security_context(spec: &RenovateJobSpec) -> PodSecurityContext {
    if let Some(pod) = spec.security_context.as_ref().and_then(|s| s.pod.clone()) {
        return pod;
    }
    PodSecurityContext {
        run_as_user: Some(RENOVATE_UID),
        run_as_group: Some(RENOVATE_UID),
        fs_group: Some(RENOVATE_UID),
        run_as_non_root: Some(true),
        seccomp_profile: Some(runtime_default_seccomp()),
        ..Default::default()
    }
}

fn container_security_context(spec: &RenovateJobSpec) -> SecurityContext {
    if let Some(container) = spec.security_context.as_ref().and_then(|s| s.container.clone()) {
        return container;
    }
    SecurityContext {
        run_as_user: Some(RENOVATE_UID),
        run_as_group: Some(RENOVATE_UID),
        run_as_non_root: Some(true),
        seccomp_profile: Some(runtime_default_seccomp()),
        read_only_root_filesystem: Some(false),
        privileged: Some(false),
        allow_privilege_escalation: Some(false),
        ..Default::default()
    }
}

fn runtime_default_seccomp() -> SeccompProfile {
    SeccompProfile { type_: "RuntimeDefault".to_string(), ..Default::default() }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}

#[cfg(test)]
#[path = "job_spec_tests.rs"]
mod tests;
