// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunables of the orchestration core.

use rop_adapters::JobSettings;
use rop_core::RetryPolicy;
use std::time::Duration;

/// Engine configuration, assembled by the daemon from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between executor ticks
    pub executor_interval: Duration,
    /// Pause between discovery job polls
    pub discovery_poll: Duration,
    /// Extra polls granted to a completed discovery job whose pod is not listed yet
    pub discovery_output_polls: u32,
    /// Pause between full resource resyncs
    pub sync_interval: Duration,
    /// Retry policy for store writes and job operations
    pub retry: RetryPolicy,
    pub jobs: JobSettings,
    /// Delete executor jobs that completed successfully
    pub delete_successful_jobs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executor_interval: Duration::from_secs(10),
            discovery_poll: Duration::from_secs(5),
            discovery_output_polls: 3,
            sync_interval: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            jobs: JobSettings::default(),
            delete_successful_jobs: false,
        }
    }
}

impl EngineConfig {
    rop_core::setters! {
        set {
            executor_interval: Duration,
            discovery_poll: Duration,
            discovery_output_polls: u32,
            sync_interval: Duration,
            retry: RetryPolicy,
            jobs: JobSettings,
            delete_successful_jobs: bool,
        }
    }
}
