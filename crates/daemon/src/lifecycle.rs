// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.

use rop_core::{Clock, SystemClock};
use rop_engine::Operator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Background loops of a running daemon
pub struct Daemon<C: Clock = SystemClock> {
    operator: Arc<Operator<C>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Clock> Daemon<C> {
    /// Start the scheduler, the executor loop and the resource sync loop.
    ///
    /// `cancel` should be the token the operator was built with so that
    /// in-flight discovery waits end on shutdown too.
    pub fn start(operator: Arc<Operator<C>>, cancel: CancellationToken) -> Self {
        operator.start();
        let executor = operator.spawn_executor(cancel.child_token());
        let sync = {
            let (operator, cancel) = (Arc::clone(&operator), cancel.child_token());
            tokio::spawn(async move { operator.sync_loop(cancel).await })
        };
        tracing::info!("daemon started");
        Self { operator, cancel, tasks: vec![executor, sync] }
    }

    pub fn operator(&self) -> &Arc<Operator<C>> {
        &self.operator
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the background loops and wait for them to finish.
    pub async fn shutdown(self) {
        tracing::info!("shutting down");
        self.cancel.cancel();
        self.operator.stop();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        tracing::info!("daemon stopped");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
