// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RenovateJob` controller
//!
//! Watches declared resources (and the jobs they own) and hands every change
//! to [`Operator::reconcile`]. Each resource is requeued once a minute so a
//! missed event never leaves a schedule stale for long.

use futures_util::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client};
use rop_adapters::RenovateJob;
use rop_core::{Clock, SystemClock};
use rop_engine::{EngineError, Operator};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const REQUEUE_AFTER: Duration = Duration::from_secs(60);

/// Shared state handed to every reconciliation
pub struct Context<C: Clock = SystemClock> {
    pub operator: Arc<Operator<C>>,
}

/// Reconcile one resource.
///
/// A malformed schedule is the user's to fix, so it is logged and retried on
/// the regular requeue rather than backing off as an error.
pub async fn reconcile<C: Clock>(
    resource: Arc<RenovateJob>,
    ctx: Arc<Context<C>>,
) -> Result<Action, EngineError> {
    let id = resource.id();
    tracing::debug!(resource = %id, "reconciling");
    match ctx.operator.reconcile(&id).await {
        Ok(()) => Ok(Action::requeue(REQUEUE_AFTER)),
        Err(e @ EngineError::InvalidExpression { .. }) => {
            tracing::error!(resource = %id, error = %e, "schedule not installed");
            Ok(Action::requeue(REQUEUE_AFTER))
        }
        Err(e) => Err(e),
    }
}

pub fn error_policy<C: Clock>(
    resource: Arc<RenovateJob>,
    error: &EngineError,
    _ctx: Arc<Context<C>>,
) -> Action {
    tracing::warn!(resource = %resource.id(), %error, "reconcile failed, requeueing");
    Action::requeue(REQUEUE_AFTER)
}

/// Run the controller until `cancel` fires.
pub async fn run<C: Clock>(client: Client, operator: Arc<Operator<C>>, cancel: CancellationToken) {
    let resources = Api::<RenovateJob>::all(client.clone());
    let jobs = Api::<Job>::all(client);
    let ctx = Arc::new(Context { operator });

    tracing::info!("controller started");
    let controller = Controller::new(resources, watcher::Config::default())
        .owns(jobs, watcher::Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => tracing::debug!(resource = %object, "reconciled"),
                Err(e) => tracing::warn!(error = %e, "controller error"),
            }
        });
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = controller => {}
    }
    tracing::info!("controller stopped");
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
