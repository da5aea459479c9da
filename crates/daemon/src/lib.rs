// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renovate operator daemon library
//!
//! The resource controller, environment configuration and process lifecycle
//! behind the `ropd` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod controller;
pub mod env;
pub mod error;
pub mod lifecycle;

#[cfg(test)]
mod test_fixtures;

pub use error::DaemonError;
pub use lifecycle::Daemon;
