// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron scheduler
//!
//! Named entries, each a cron expression bound to an action. While the
//! scheduler runs, every entry is a task that sleeps until its next firing.
//! Firings are recorded in [`Health`] before and after the action, and a
//! panicking action is contained to its own task. The record after the action
//! is made from the action's task, so stopping the scheduler or replacing the
//! entry mid-firing still completes it.

use crate::error::EngineError;
use crate::health::Health;
use chrono::{DateTime, Utc};
use cron::Schedule;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rop_core::{Clock, SystemClock};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Work run on every firing of an entry.
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Identity of one installation of an entry.
///
/// Reinstalling with the same expression keeps the id; a changed expression
/// gets a new one.
pub type EntryId = u64;

/// A parsed cron expression.
///
/// When both day-of-month and day-of-week are restricted, a day matching
/// either field fires, so the expression is held as two schedules and the
/// earlier firing wins.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedules: Vec<Schedule>,
}

impl CronSchedule {
    /// The expression as it was installed.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First firing strictly after `at`.
    pub fn next_after(&self, at: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules.iter().filter_map(|s| s.after(at).next()).min()
    }
}

struct Entry {
    id: EntryId,
    schedule: CronSchedule,
    action: Action,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    running: bool,
    next_id: EntryId,
    entries: HashMap<String, Entry>,
}

/// Fires named cron entries
pub struct Scheduler<C: Clock = SystemClock> {
    state: Mutex<State>,
    health: Health<C>,
    clock: C,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(health: Health<C>, clock: C) -> Self {
        Self { state: Mutex::new(State::default()), health, clock }
    }

    /// Install or update the entry `name`.
    ///
    /// An identical expression is a no-op. A changed expression replaces the
    /// entry. A malformed expression fails and leaves any existing entry as is.
    pub fn install(
        &self,
        expression: &str,
        name: &str,
        action: Action,
    ) -> Result<EntryId, EngineError> {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get(name) {
            if entry.schedule.expression() == expression {
                return Ok(entry.id);
            }
        }
        let schedule = parse_expression(expression)?;

        if let Some(old) = state.entries.remove(name) {
            tracing::debug!(entry = name, old = old.schedule.expression(), "replacing cron entry");
            abort(old);
        }
        state.next_id += 1;
        let mut entry = Entry { id: state.next_id, schedule, action, task: None };
        if state.running {
            entry.task = Some(self.spawn_entry(name, &entry));
        }
        let id = entry.id;
        let next = entry.schedule.next_after(&self.clock.now());
        state.entries.insert(name.to_string(), entry);
        drop(state);

        self.health.entry_installed(name, expression, next);
        tracing::info!(entry = name, expression, id, "installed cron entry");
        Ok(id)
    }

    /// Remove the entry `name`; absent entries are ignored.
    pub fn remove(&self, name: &str) {
        let removed = self.state.lock().entries.remove(name);
        if let Some(entry) = removed {
            abort(entry);
            self.health.entry_removed(name);
            tracing::info!(entry = name, "removed cron entry");
        }
    }

    /// Next firing of `name`, `None` when absent.
    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        let state = self.state.lock();
        state.entries.get(name)?.schedule.next_after(&self.clock.now())
    }

    pub fn entry_id(&self, name: &str) -> Option<EntryId> {
        self.state.lock().entries.get(name).map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin firing entries.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        for (name, entry) in state.entries.iter_mut() {
            entry.task = Some(self.spawn_entry(name, entry));
        }
        drop(state);
        self.health.set_scheduler_running(true);
        tracing::info!("scheduler started");
    }

    /// Stop firing entries. Actions already in flight run to completion.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.running = false;
        for entry in state.entries.values_mut() {
            if let Some(task) = entry.task.take() {
                task.abort();
            }
        }
        drop(state);
        self.health.set_scheduler_running(false);
        tracing::info!("scheduler stopped");
    }

    /// Fire `name` now, outside its schedule. `None` when absent.
    pub fn run_now(&self, name: &str) -> Option<JoinHandle<()>> {
        let (action, schedule) = {
            let state = self.state.lock();
            let entry = state.entries.get(name)?;
            (Arc::clone(&entry.action), entry.schedule.clone())
        };
        let (name, health, now) = (name.to_string(), self.health.clone(), self.clock.now());
        Some(tokio::spawn(async move { fire(&name, &action, &schedule, &health, now).await }))
    }

    fn spawn_entry(&self, name: &str, entry: &Entry) -> JoinHandle<()> {
        let name = name.to_string();
        let schedule = entry.schedule.clone();
        let action = Arc::clone(&entry.action);
        let health = self.health.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let mut last = clock.now();
            loop {
                let from = clock.now().max(last);
                let Some(next) = schedule.next_after(&from) else {
                    tracing::info!(entry = %name, "cron entry has no further firings");
                    return;
                };
                tokio::time::sleep((next - from).to_std().unwrap_or_default()).await;
                last = next;
                fire(&name, &action, &schedule, &health, next).await;
            }
        })
    }
}

impl<C: Clock> Drop for Scheduler<C> {
    fn drop(&mut self) {
        for (_, entry) in self.state.get_mut().entries.drain() {
            abort(entry);
        }
    }
}

fn abort(entry: Entry) {
    if let Some(task) = entry.task {
        task.abort();
    }
}

/// Marks an entry as fired when dropped.
struct Firing<C: Clock> {
    name: String,
    health: Health<C>,
    schedule: CronSchedule,
    at: DateTime<Utc>,
}

impl<C: Clock> Firing<C> {
    fn start(name: &str, health: &Health<C>, schedule: &CronSchedule, at: DateTime<Utc>) -> Self {
        health.entry_firing(name);
        Self { name: name.to_string(), health: health.clone(), schedule: schedule.clone(), at }
    }
}

impl<C: Clock> Drop for Firing<C> {
    fn drop(&mut self) {
        let next = self.schedule.next_after(&self.at);
        self.health.entry_fired(&self.name, self.schedule.expression(), next);
    }
}

/// Run one firing through the health wrapper.
async fn fire<C: Clock>(
    name: &str,
    action: &Action,
    schedule: &CronSchedule,
    health: &Health<C>,
    at: DateTime<Utc>,
) {
    let firing = Firing::start(name, health, schedule, at);
    tracing::info!(entry = name, "cron entry firing");
    let work = action();
    let task = tokio::spawn(async move {
        let _firing = firing;
        work.await;
    });
    if let Err(e) = task.await {
        tracing::error!(entry = name, error = %e, "cron action aborted");
    }
}

/// Parse a standard 5-field cron expression or an `@` descriptor.
///
/// Day-of-week follows the usual convention (`0` and `7` are Sunday); it is
/// rewritten to names for the `cron` crate, which counts from Sunday = 1 and
/// expects a leading seconds field. The `cron` crate requires both day fields
/// to match, so a restricted pair is split into one schedule per field.
pub fn parse_expression(expression: &str) -> Result<CronSchedule, EngineError> {
    let invalid = |reason: String| EngineError::InvalidExpression {
        expression: expression.to_string(),
        reason,
    };
    let parse =
        |normalized: &str| Schedule::from_str(normalized).map_err(|e| invalid(e.to_string()));

    let trimmed = expression.trim();
    if trimmed.starts_with('@') {
        let schedules = vec![parse(trimmed)?];
        return Ok(CronSchedule { expression: expression.to_string(), schedules });
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = fields.as_slice() else {
        return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
    };
    let weekday = normalize_weekdays(weekday);
    let schedules = if is_wildcard(day) || is_wildcard(&weekday) {
        vec![parse(&format!("0 {} {} {} {} {}", minute, hour, day, month, weekday))?]
    } else {
        vec![
            parse(&format!("0 {} {} {} {} *", minute, hour, day, month))?,
            parse(&format!("0 {} {} * {} {}", minute, hour, month, weekday))?,
        ]
    };
    Ok(CronSchedule { expression: expression.to_string(), schedules })
}

fn is_wildcard(field: &str) -> bool {
    matches!(field, "*" | "?")
}

fn normalize_weekdays(field: &str) -> String {
    field.split(',').map(normalize_weekday_item).collect::<Vec<_>>().join(",")
}

/// Rewrite one list item (`N`, `A-B`, with an optional `/step`).
fn normalize_weekday_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    let suffix = step.map(|s| format!("/{}", s)).unwrap_or_default();
    match base.split_once('-') {
        // Sunday as 7 wraps past Saturday
        Some((start, "7")) => {
            let hits_sunday = match step.map(str::parse::<i64>) {
                None => true,
                Some(Ok(n)) if n > 0 => start.parse::<i64>().is_ok_and(|s| (7 - s) % n == 0),
                Some(_) => false,
            };
            let range = format!("{}-Sat{}", weekday_name(start), suffix);
            if hits_sunday {
                format!("{},Sun", range)
            } else {
                range
            }
        }
        Some((start, end)) => format!("{}-{}{}", weekday_name(start), weekday_name(end), suffix),
        None => format!("{}{}", weekday_name(base), suffix),
    }
}

fn weekday_name(token: &str) -> &str {
    match token {
        "0" | "7" => "Sun",
        "1" => "Mon",
        "2" => "Tue",
        "3" => "Wed",
        "4" => "Thu",
        "5" => "Fri",
        "6" => "Sat",
        other => other,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
