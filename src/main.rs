//! # Parameter Sync Controller
//!
//! A Kubernetes controller that syncs AWS SSM Parameter Store values into
//! Secrets.
//!
//! ## Overview
//!
//! 1. **Watches `ParameterSync` resources** across all namespaces
//! 2. **Resolves parameters** - a single named parameter, or every parameter
//!    under a path (locator with a trailing `/`), with paginated enumeration
//! 3. **Writes the target Secret** - one data entry per parameter, keyed by
//!    the flattened store path, owned by the `ParameterSync` for cascade
//!    deletion
//! 4. **Refreshes on an interval** - `updateIntervalSeconds` drives periodic
//!    requeues; 0 disables the timer
//!
//! ## Features
//!
//! - **Multi-namespace**: watches `ParameterSync` resources everywhere
//! - **SecureString support**: optional decryption of encrypted parameters
//! - **Prometheus metrics**: reconciliation and store-call metrics
//! - **Health probes**: HTTP endpoints for liveness and readiness checks
//!
//! The SSM client is constructed once at startup; if that fails the process
//! exits, since no reconciliation can proceed without it.

use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::info;

use parameter_sync_controller::reconciler::Reconciler;
use parameter_sync_controller::server::{resolve_port, start_server, ServerState};
use parameter_sync_controller::store::AwsParameterStore;
use parameter_sync_controller::{metrics, ParameterSync};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parameter_sync_controller=info".into()),
        )
        .init();

    info!("Starting Parameter Sync Controller");

    metrics::register_metrics()?;

    // HTTP server for metrics and probes
    let server_state = Arc::new(ServerState::default());
    let server_port = resolve_port(std::env::var("METRICS_PORT").ok().as_deref());

    let probe_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, probe_state).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default().await?;

    // Fatal on failure: every reconciliation needs a working store client.
    let store = Arc::new(
        AwsParameterStore::new()
            .await
            .context("Failed to construct SSM Parameter Store client")?,
    );

    // Watch ParameterSync resources in all namespaces, and the Secrets they
    // own so an externally deleted Secret is recreated on the next event.
    let syncs: Api<ParameterSync> = Api::all(client.clone());
    let owned_secrets: Api<Secret> = Api::all(client.clone());

    let reconciler = Arc::new(Reconciler::new(client, store));

    server_state.mark_ready();

    Controller::new(syncs, watcher::Config::default())
        .owns(owned_secrets, watcher::Config::default())
        .shutdown_on_signal()
        .run(
            Reconciler::reconcile,
            Reconciler::error_policy,
            reconciler,
        )
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");
    Ok(())
}
