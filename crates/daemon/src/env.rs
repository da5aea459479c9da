// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use rop_adapters::JobSettings;
use rop_core::RetryPolicy;
use rop_engine::EngineConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DELETE_SUCCESSFUL_JOBS: &str = "ROP_DELETE_SUCCESSFUL_JOBS";
pub const JOB_TIMEOUT_SECONDS: &str = "ROP_JOB_TIMEOUT_SECONDS";
pub const JOB_BACKOFF_LIMIT: &str = "ROP_JOB_BACKOFF_LIMIT";
pub const JOB_TTL_SECONDS_AFTER_FINISHED: &str = "ROP_JOB_TTL_SECONDS_AFTER_FINISHED";
pub const EXECUTOR_INTERVAL_MS: &str = "ROP_EXECUTOR_INTERVAL_MS";
pub const DISCOVERY_POLL_MS: &str = "ROP_DISCOVERY_POLL_MS";
pub const RETRY_ATTEMPTS: &str = "ROP_RETRY_ATTEMPTS";
pub const RETRY_DELAY_MS: &str = "ROP_RETRY_DELAY_MS";
pub const SYNC_INTERVAL_MS: &str = "ROP_SYNC_INTERVAL_MS";

/// Malformed configuration value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{key} must be {expected}, got {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Build the engine configuration from `ROP_*` variables.
///
/// Unset or blank variables keep their defaults.
pub fn engine_config() -> Result<EngineConfig, ConfigError> {
    let defaults = EngineConfig::default();

    let mut jobs = JobSettings::default();
    if let Some(seconds) = parsed::<i64>(JOB_TIMEOUT_SECONDS, "a positive integer")? {
        jobs = jobs.active_deadline_seconds(positive(JOB_TIMEOUT_SECONDS, seconds)?);
    }
    if let Some(limit) = parsed::<i32>(JOB_BACKOFF_LIMIT, "a non-negative integer")? {
        jobs = jobs.backoff_limit(non_negative(JOB_BACKOFF_LIMIT, limit)?);
    }
    jobs = jobs.ttl_seconds_after_finished(ttl_seconds()?);

    let mut retry = RetryPolicy::default();
    if let Some(attempts) = parsed::<u32>(RETRY_ATTEMPTS, "a positive integer")? {
        retry = retry.attempts(positive(RETRY_ATTEMPTS, attempts)?);
    }
    if let Some(delay) = millis(RETRY_DELAY_MS)? {
        retry = retry.initial_delay(delay);
    }

    let config = defaults
        .clone()
        .delete_successful_jobs(flag(DELETE_SUCCESSFUL_JOBS)?.unwrap_or(false))
        .executor_interval(millis(EXECUTOR_INTERVAL_MS)?.unwrap_or(defaults.executor_interval))
        .discovery_poll(millis(DISCOVERY_POLL_MS)?.unwrap_or(defaults.discovery_poll))
        .sync_interval(millis(SYNC_INTERVAL_MS)?.unwrap_or(defaults.sync_interval))
        .retry(retry)
        .jobs(jobs);
    Ok(config)
}

/// `ttlSecondsAfterFinished` for executor jobs; `-1` disables it.
fn ttl_seconds() -> Result<Option<i32>, ConfigError> {
    match parsed::<i32>(JOB_TTL_SECONDS_AFTER_FINISHED, "a non-negative integer or -1")? {
        None | Some(-1) => Ok(None),
        Some(seconds) => non_negative(JOB_TTL_SECONDS_AFTER_FINISHED, seconds).map(Some),
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parsed<T: FromStr>(key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError> {
    var(key)
        .map(|value| value.parse::<T>().map_err(|_| ConfigError { key, value, expected }))
        .transpose()
}

fn millis(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match parsed::<u64>(key, "a positive number of milliseconds")? {
        Some(ms) => positive(key, ms).map(|ms| Some(Duration::from_millis(ms))),
        None => Ok(None),
    }
}

fn flag(key: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = var(key) else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError { key, value, expected: "true or false" }),
    }
}

fn positive<T: PartialOrd + Default + ToString>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError { key, value: value.to_string(), expected: "positive" })
    }
}

fn non_negative<T: PartialOrd + Default + ToString>(
    key: &'static str,
    value: T,
) -> Result<T, ConfigError> {
    if value >= T::default() {
        Ok(value)
    } else {
        Err(ConfigError { key, value: value.to_string(), expected: "non-negative" })
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
