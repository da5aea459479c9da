// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rop-core: domain types for the renovate operator

pub mod macros;

pub mod clock;
pub mod log_scan;
pub mod naming;
pub mod resource;
pub mod retry;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use log_scan::has_issues;
pub use naming::{discovery_job_name, executor_job_name, MAX_NAME_LEN};
pub use resource::ResourceId;
pub use retry::{retry, RetryPolicy, Transient};
#[cfg(any(test, feature = "test-support"))]
pub use status::ProjectStatusBuilder;
pub use status::{advance, JobPhase, ProjectStatus, Status};
