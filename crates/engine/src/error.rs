// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rop_adapters::{JobError, StoreError};
use rop_core::ResourceId;
use thiserror::Error;

/// Errors from the orchestration core
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("discovery job {0} failed")]
    DiscoveryFailed(String),
    #[error("discovery job {0} not found")]
    DiscoveryJobNotFound(String),
    #[error("unusable output from discovery job {job}: {reason}")]
    DiscoveryOutput { job: String, reason: String },
    #[error("discovery already running for {0}")]
    DiscoveryAlreadyRunning(ResourceId),
    #[error("no pods found for job {0}")]
    NoPods(String),
    #[error("cancelled")]
    Cancelled,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("job error: {0}")]
    Job(#[from] JobError),
}

impl EngineError {
    /// Map a store error for `id`, turning `NotFound` into [`EngineError::ResourceNotFound`].
    pub(crate) fn from_store(e: StoreError, id: &ResourceId) -> Self {
        match e {
            StoreError::NotFound(_) => EngineError::ResourceNotFound(id.clone()),
            other => EngineError::Store(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::ResourceNotFound(_))
    }
}
