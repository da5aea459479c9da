// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the cluster: the `RenovateJob` resource store and the Job runner.

pub mod crd;
pub mod job_spec;
pub mod jobs;
pub mod k8s;
pub mod store;

pub use crd::{
    PodMetadataSpec, RenovateJob, RenovateJobSpec, RenovateJobStatus, SecurityContextSpec,
    ServiceAccountSpec,
};
pub use job_spec::{build_discovery_job, build_executor_job, JobSettings};
pub use jobs::{phase_from_conditions, phase_from_counters, pod_succeeded, JobAdapter, JobError};
pub use k8s::KubeAdapter;
pub use store::{ResourceStore, StoreError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use jobs::{FakeJobAdapter, JobCall, JobOutcome};
#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeResourceStore, StoreCall};
