// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rop-engine: orchestration core of the renovate operator

mod config;
mod discovery;
mod error;
mod executor;
mod health;
mod locks;
mod operator;
mod scheduler;
mod status_manager;

#[cfg(test)]
mod test_helpers;

pub use config::EngineConfig;
pub use discovery::DiscoveryAgent;
pub use error::EngineError;
pub use executor::{Executor, SweepOutcome};
pub use health::{
    ApplicationHealth, EntryHealth, ExecutorHealth, Health, SchedulerHealth, SweepHealth,
};
pub use locks::KeyedLocks;
pub use operator::{DiscoveryCycle, Operator};
pub use scheduler::{parse_expression, Action, CronSchedule, EntryId, Scheduler};
pub use status_manager::ProjectStatusManager;
