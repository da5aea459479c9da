// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence of declared resources and their status sub-resource.

use crate::crd::RenovateJob;
use async_trait::async_trait;
use rop_core::{ResourceId, Transient};
use thiserror::Error;

/// Errors from resource store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("stale resource version for {0}")]
    Conflict(String),
    #[error("api error ({code}): {message}")]
    Api { code: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed resource: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict(_) | StoreError::Transport(_) => true,
            StoreError::Api { code, .. } => *code == 429 || *code >= 500,
            StoreError::NotFound(_) | StoreError::Serialization(_) => false,
        }
    }
}

/// Adapter for the backing store of `RenovateJob` resources
#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
    /// Every declared resource, cluster-wide.
    async fn list(&self) -> Result<Vec<ResourceId>, StoreError>;

    /// Authoritative copy of one resource.
    async fn get(&self, id: &ResourceId) -> Result<RenovateJob, StoreError>;

    /// Write `resource.status`.
    ///
    /// Fails with [`StoreError::Conflict`] when `resource.metadata.resource_version`
    /// is no longer current.
    async fn update_status(&self, resource: &RenovateJob) -> Result<(), StoreError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ResourceStore, StoreError};
    use crate::crd::RenovateJob;
    use async_trait::async_trait;
    use kube::ResourceExt;
    use parking_lot::Mutex;
    use rop_core::ResourceId;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    /// Recorded store call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        List,
        Get(ResourceId),
        UpdateStatus(ResourceId),
    }

    #[derive(Default)]
    struct FakeStoreState {
        resources: BTreeMap<ResourceId, RenovateJob>,
        next_version: u64,
        update_failures: VecDeque<StoreError>,
        calls: Vec<StoreCall>,
    }

    /// In-memory store with resource versions and optimistic concurrency.
    #[derive(Clone, Default)]
    pub struct FakeResourceStore {
        inner: Arc<Mutex<FakeStoreState>>,
    }

    impl FakeResourceStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Insert or replace a resource, stamping a fresh resource version.
        pub fn put(&self, mut resource: RenovateJob) {
            let mut state = self.inner.lock();
            state.next_version += 1;
            resource.metadata.resource_version = Some(state.next_version.to_string());
            if resource.metadata.uid.is_none() {
                resource.metadata.uid = Some(format!("uid-{}", resource.name_any()));
            }
            state.resources.insert(resource.id(), resource);
        }

        pub fn remove(&self, id: &ResourceId) {
            self.inner.lock().resources.remove(id);
        }

        /// Current stored copy, if any.
        pub fn resource(&self, id: &ResourceId) -> Option<RenovateJob> {
            self.inner.lock().resources.get(id).cloned()
        }

        /// Fail the next status updates with these errors, in order.
        pub fn fail_updates(&self, errors: impl IntoIterator<Item = StoreError>) {
            self.inner.lock().update_failures.extend(errors);
        }

        /// Bump the stored version without changing content, as a concurrent writer would.
        pub fn touch(&self, id: &ResourceId) {
            let resource = self.resource(id);
            if let Some(resource) = resource {
                self.put(resource);
            }
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.inner.lock().calls.clone()
        }

        pub fn update_count(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, StoreCall::UpdateStatus(_))).count()
        }
    }

    #[async_trait]
    impl ResourceStore for FakeResourceStore {
        async fn list(&self) -> Result<Vec<ResourceId>, StoreError> {
            let mut state = self.inner.lock();
            state.calls.push(StoreCall::List);
            Ok(state.resources.keys().cloned().collect())
        }

        async fn get(&self, id: &ResourceId) -> Result<RenovateJob, StoreError> {
            let mut state = self.inner.lock();
            state.calls.push(StoreCall::Get(id.clone()));
            state.resources.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
        }

        async fn update_status(&self, resource: &RenovateJob) -> Result<(), StoreError> {
            let id = resource.id();
            let mut state = self.inner.lock();
            state.calls.push(StoreCall::UpdateStatus(id.clone()));
            if let Some(err) = state.update_failures.pop_front() {
                return Err(err);
            }
            state.next_version += 1;
            let version = state.next_version.to_string();
            let stored =
                state.resources.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if stored.metadata.resource_version != resource.metadata.resource_version {
                return Err(StoreError::Conflict(id.to_string()));
            }
            stored.status = resource.status.clone();
            stored.metadata.resource_version = Some(version);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeResourceStore, StoreCall};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
