// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-attempt exponential backoff.

use std::future::Future;
use std::time::Duration;

/// Classifies an error as worth another attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 5, initial_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    crate::setters! {
        set {
            attempts: u32,
            initial_delay: Duration,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self { attempts: 1, initial_delay: Duration::ZERO }
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// `op` is invoked afresh on every attempt, so read-modify-write closures
/// reload their input each time. The last error is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts || !e.is_transient() => return Err(e),
            Err(e) => {
                tracing::debug!(attempt, attempts, error = %e, "attempt failed, backing off");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
