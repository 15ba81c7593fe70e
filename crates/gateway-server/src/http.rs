// SPDX-License-Identifier: Apache-2.0
//! HTTP server: exposed properties, health checks and Prometheus metrics.

use crate::metrics::metrics;
use crate::properties::ResolvedProperties;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vault_gateway_secrets::ValidationOutcome;

/// Last known state of the secret store, as seen by the startup diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreHealth {
    Pending = 0,
    Connected = 1,
    NoData = 2,
    Unreachable = 3,
    Skipped = 4,
}

impl StoreHealth {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StoreHealth::Connected,
            2 => StoreHealth::NoData,
            3 => StoreHealth::Unreachable,
            4 => StoreHealth::Skipped,
            _ => StoreHealth::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreHealth::Pending => "pending",
            StoreHealth::Connected => "connected",
            StoreHealth::NoData => "no_data",
            StoreHealth::Unreachable => "unreachable",
            StoreHealth::Skipped => "skipped",
        }
    }
}

impl From<&ValidationOutcome> for StoreHealth {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Connected { .. } => StoreHealth::Connected,
            ValidationOutcome::NoData => StoreHealth::NoData,
            ValidationOutcome::Failed { .. } => StoreHealth::Unreachable,
        }
    }
}

/// Readiness state shared between the HTTP server and the startup sequence.
#[derive(Clone)]
pub struct ServerState {
    /// Whether startup finished and traffic may be served.
    ready: Arc<AtomicBool>,
    /// Whether graceful shutdown has begun.
    draining: Arc<AtomicBool>,
    secret_store: Arc<AtomicU8>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            draining: Arc::new(AtomicBool::new(false)),
            secret_store: Arc::new(AtomicU8::new(StoreHealth::Pending as u8)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Stop reporting ready; used when graceful shutdown begins.
    pub fn start_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn set_secret_store(&self, health: StoreHealth) {
        self.secret_store.store(health as u8, Ordering::SeqCst);
    }

    pub fn secret_store(&self) -> StoreHealth {
        StoreHealth::from_u8(self.secret_store.load(Ordering::SeqCst))
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub properties: Arc<ResolvedProperties>,
    pub server: ServerState,
}

impl AppState {
    pub fn new(properties: ResolvedProperties, server: ServerState) -> Self {
        Self {
            properties: Arc::new(properties),
            server,
        }
    }
}

#[derive(serde::Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    secret_store: &'static str,
}

/// GET /vault/properties - resolved configuration values.
///
/// Unauthenticated: values bound at startup, including any password, are
/// returned to every caller.
async fn properties_handler(State(state): State<AppState>) -> Json<ResolvedProperties> {
    metrics().property_requests_total.inc();
    Json(state.properties.as_ref().clone())
}

/// Health probe - always 200, reports the startup diagnostic result.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            secret_store: state.server.secret_store().as_str(),
        }),
    )
}

/// Readiness probe - returns 200 once startup finished, 503 otherwise.
/// During graceful shutdown (draining), returns 503 with status "draining".
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.server.is_ready() {
        (StatusCode::OK, Json(StatusResponse { status: "ready" })).into_response()
    } else if state.server.is_draining() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusResponse { status: "draining" }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusResponse {
                status: "not_ready",
            }),
        )
            .into_response()
    }
}

/// Liveness probe.
async fn live_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(StatusResponse { status: "alive" }))
}

/// Prometheus metrics endpoint.
async fn metrics_handler() -> impl IntoResponse {
    let body = metrics().encode();
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

/// Build the HTTP router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/vault/properties", get(properties_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/live", get(live_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve HTTP on `listener` until `shutdown` resolves.
pub async fn serve_http<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    info!(addr = ?listener.local_addr().ok(), "HTTP server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %e, "HTTP server error");
        return Err(e.into());
    }

    Ok(())
}
