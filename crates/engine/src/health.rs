// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness state of the scheduler and executor, for health reporting.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rop_core::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One scheduler entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryHealth {
    pub schedule: String,
    pub next_run: Option<DateTime<Utc>>,
    pub last_fired: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerHealth {
    pub running: bool,
    pub entries: BTreeMap<String, EntryHealth>,
}

/// Sweep state of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepHealth {
    pub is_running: bool,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorHealth {
    pub running: bool,
    pub resources: BTreeMap<String, SweepHealth>,
}

/// Snapshot served to health endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationHealth {
    pub scheduler: SchedulerHealth,
    pub executor: ExecutorHealth,
    /// Both the scheduler and the executor loop are running
    pub healthy: bool,
}

/// Shared, cheaply cloneable health registry.
#[derive(Clone)]
pub struct Health<C: Clock = SystemClock> {
    inner: Arc<Mutex<ApplicationHealth>>,
    clock: C,
}

impl<C: Clock> Health<C> {
    pub fn new(clock: C) -> Self {
        Self { inner: Arc::new(Mutex::new(ApplicationHealth::default())), clock }
    }

    pub fn snapshot(&self) -> ApplicationHealth {
        let mut health = self.inner.lock().clone();
        health.healthy = health.scheduler.running && health.executor.running;
        health
    }

    pub fn set_scheduler_running(&self, running: bool) {
        self.inner.lock().scheduler.running = running;
    }

    pub fn entry_installed(&self, name: &str, schedule: &str, next_run: Option<DateTime<Utc>>) {
        let entry = EntryHealth {
            schedule: schedule.to_string(),
            next_run,
            last_fired: None,
            is_running: false,
            last_update: self.clock.now(),
        };
        self.inner.lock().scheduler.entries.insert(name.to_string(), entry);
    }

    pub fn entry_removed(&self, name: &str) {
        self.inner.lock().scheduler.entries.remove(name);
    }

    /// An entry's action started.
    pub fn entry_firing(&self, name: &str) {
        let now = self.clock.now();
        if let Some(entry) = self.inner.lock().scheduler.entries.get_mut(name) {
            entry.is_running = true;
            entry.last_fired = Some(now);
            entry.last_update = now;
        }
    }

    /// An entry's action returned (or panicked). A firing of an entry since
    /// reinstalled under another schedule is ignored.
    pub fn entry_fired(&self, name: &str, schedule: &str, next_run: Option<DateTime<Utc>>) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let current = inner.scheduler.entries.get_mut(name).filter(|e| e.schedule == schedule);
        if let Some(entry) = current {
            entry.is_running = false;
            entry.next_run = next_run;
            entry.last_update = now;
        }
    }

    pub fn set_executor_running(&self, running: bool) {
        self.inner.lock().executor.running = running;
    }

    pub fn sweep_started(&self, key: &str) {
        self.set_sweep(key, true);
    }

    pub fn sweep_finished(&self, key: &str) {
        self.set_sweep(key, false);
    }

    pub fn sweep_removed(&self, key: &str) {
        self.inner.lock().executor.resources.remove(key);
    }

    /// Drop sweep state of every resource not in `live`.
    pub fn retain_sweeps(&self, live: &HashSet<String>) {
        self.inner.lock().executor.resources.retain(|key, _| live.contains(key));
    }

    fn set_sweep(&self, key: &str, is_running: bool) {
        let sweep = SweepHealth { is_running, last_update: self.clock.now() };
        self.inner.lock().executor.resources.insert(key.to_string(), sweep);
    }
}
