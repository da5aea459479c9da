// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic Kubernetes job names.
//!
//! Names are normalized (lowercase, `/ _ .` → `-`), truncated, and suffixed
//! with 8 hex characters of a SHA-256 over the untruncated name so two long
//! names sharing a prefix never collide. Results stay within the 63-character
//! resource-name limit.

use sha2::{Digest, Sha256};

/// Kubernetes resource-name limit.
pub const MAX_NAME_LEN: usize = 63;

const EXECUTOR_PREFIX_LEN: usize = 54;
const DISCOVERY_SUFFIX: &str = "-discovery";
const DISCOVERY_BASE_LEN: usize = EXECUTOR_PREFIX_LEN - DISCOVERY_SUFFIX.len();

/// Name of the executor job running `project` for resource `resource_name`.
pub fn executor_job_name(resource_name: &str, project: &str) -> String {
    let full = normalize(&format!("{}-{}", resource_name, project));
    let hash = short_hash(&full);
    format!("{}-{}", truncate(&full, EXECUTOR_PREFIX_LEN), hash)
}

/// Name of the discovery job of resource `resource_name`.
pub fn discovery_job_name(resource_name: &str) -> String {
    let base = normalize(resource_name);
    let hash = short_hash(&format!("{}{}", base, DISCOVERY_SUFFIX));
    format!("{}{}-{}", truncate(&base, DISCOVERY_BASE_LEN), DISCOVERY_SUFFIX, hash)
}

fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '_' | '.' => '-',
            c => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// First 4 bytes of SHA-256, hex encoded.
fn short_hash(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Truncate to at most `max` bytes on a char boundary.
fn truncate(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
