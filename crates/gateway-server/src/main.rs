// SPDX-License-Identifier: Apache-2.0
use crate::config::Args;
use crate::http::{AppState, ServerState, StoreHealth, serve_http};
use crate::properties::PropertyBinder;
use crate::startup::{build_client, check_secret_store, shutdown_signal};
use crate::telemetry::{init_logging, shutdown_telemetry};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use vault_gateway_secrets::{ConnectionValidator, SecretPath, SecretStoreClient};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format, args.telemetry_config().as_ref())?;

    let state = ServerState::new();
    let client = build_client(&args.store_config());

    let validation = args.validation_config();
    if validation.enabled {
        let validator = ConnectionValidator::from_config(&validation)
            .with_context(|| format!("invalid --validation-path {:?}", validation.path))?;
        let client = client.as_ref().map(|c| c.as_ref() as &dyn SecretStoreClient);
        check_secret_store(&validator, client, &state).await;
    } else {
        info!("startup secret store check skipped");
        state.set_secret_store(StoreHealth::Skipped);
    }

    let properties_path = args
        .properties_path
        .as_deref()
        .map(SecretPath::new)
        .transpose()
        .context("invalid --properties-path")?;
    let binder = PropertyBinder::new(args.explicit_properties());
    let properties = match (&client, &properties_path) {
        (Ok(client), Some(path)) => binder.resolve(Some((client.as_ref(), path))).await,
        (Err(err), Some(path)) => {
            warn!(path = %path, error = %err.display_chain(), "secret store client unavailable, properties use defaults");
            binder.resolve(None).await
        }
        (_, None) => binder.resolve(None).await,
    };

    let listener = TcpListener::bind(args.listen_http)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", args.listen_http))?;

    let app_state = AppState::new(properties, state.clone());
    let shutdown = Arc::new(Notify::new());
    let mut server = tokio::spawn(serve_http(listener, app_state, {
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    }));

    state.set_ready(true);
    info!(addr = %args.listen_http, "vault gateway ready");

    tokio::select! {
        result = &mut server => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(error = %err, "HTTP server stopped"),
                Err(err) => error!(error = %err, "HTTP server task failed"),
            }
        }
        _ = shutdown_signal() => {
            state.start_draining();
            shutdown.notify_one();
            let grace = Duration::from_secs(args.shutdown_timeout_secs);
            match tokio::time::timeout(grace, server).await {
                Ok(_) => info!("HTTP server drained"),
                Err(_) => warn!(timeout_secs = args.shutdown_timeout_secs, "shutdown timeout elapsed, exiting"),
            }
        }
    }

    shutdown_telemetry();
    Ok(())
}

mod config;
mod http;
mod metrics;
mod properties;
mod startup;
mod telemetry;
