// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lightweight handle to a declared resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a declared resource: `(name, namespace)`.
///
/// Passed around instead of full resource bodies so every component
/// re-reads the authoritative copy from the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub name: String,
    pub namespace: String,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into() }
    }

    /// Registry key shared by the scheduler, executor and discovery locks.
    ///
    /// Format: `<name>-<namespace>`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.name, self.namespace)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
