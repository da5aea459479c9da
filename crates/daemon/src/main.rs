// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renovate operator daemon (ropd)

use rop_adapters::KubeAdapter;
use rop_core::SystemClock;
use rop_daemon::{controller, env, Daemon, DaemonError};
use rop_engine::Operator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = env::engine_config()?;
    tracing::info!(?config, "starting ropd");

    let client = kube::Client::try_default().await?;
    let adapter = Arc::new(KubeAdapter::new(client.clone()));
    let cancel = CancellationToken::new();
    let operator = Arc::new(Operator::new(
        adapter.clone(),
        adapter,
        config,
        SystemClock,
        cancel.clone(),
    ));

    let daemon = Daemon::start(Arc::clone(&operator), cancel.clone());
    let controller = tokio::spawn(controller::run(client, operator, cancel.child_token()));

    let signal = tokio::signal::ctrl_c().await;
    daemon.shutdown().await;
    if let Err(e) = controller.await {
        tracing::warn!(error = %e, "controller task ended abnormally");
    }
    signal?;
    Ok(())
}
