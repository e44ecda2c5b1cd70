//! HTTP surface
//!
//! One axum router serves event ingestion and introspection:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /` | Ingest one event (JSON) and fan it out |
//! | `GET /debug/vars` | Expvar-style JSON map of every counter |
//! | `GET /metrics` | Prometheus text exposition |
//! | `GET /ping` | Liveness (`pong`) |
//! | `GET /healthz` | Health check (JSON) |

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use herald_metrics::{InputOutcome, InputRecorder};
use herald_pipeline::Dispatcher;
use herald_protocol::Event;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Input channel name for events received over HTTP
pub const HTTP_INPUT: &str = "http";

/// Prometheus text exposition content type
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared state for handlers
pub struct ServerState {
    pub dispatcher: Arc<Dispatcher>,
    pub input: InputRecorder,
    /// Fan-out joins still running, drained on shutdown
    pub deliveries: TaskTracker,
}

impl ServerState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let input = dispatcher.registry().input_recorder(HTTP_INPUT);
        Self {
            dispatcher,
            input,
            deliveries: TaskTracker::new(),
        }
    }

    /// Stop accepting deliveries and wait up to `grace` for the running ones
    ///
    /// Returns `false` when the grace period ran out first.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.deliveries.close();
        let pending = self.deliveries.len();
        if pending > 0 {
            info!(pending, grace = ?grace, "waiting for in-flight deliveries");
        }
        match tokio::time::timeout(grace, self.deliveries.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    pending = self.deliveries.len(),
                    "grace period elapsed, abandoning deliveries"
                );
                false
            }
        }
    }
}

/// Build the axum router
pub fn build_router(state: Arc<ServerState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/", post(ingest))
        .route("/debug/vars", get(debug_vars))
        .route("/metrics", get(metrics))
        .route("/ping", get(ping))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on `listener` until `cancel` fires
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

/// POST / - decode one event and dispatch it
async fn ingest(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    state.input.record_total();

    let event = match Event::from_json(&body) {
        Ok(event) => event,
        Err(e) => {
            state.input.record(InputOutcome::Rejected);
            warn!(input = HTTP_INPUT, error = %e, bytes = body.len(), "rejected malformed event");
            return (StatusCode::BAD_REQUEST, format!("{e}\n")).into_response();
        }
    };
    state.input.record(InputOutcome::Accepted);
    debug!(rule = %event.rule, priority = %event.priority, "event received");

    let dispatched = state.dispatcher.dispatch(Arc::new(event));
    if !dispatched.is_empty() {
        // join() logs failed tasks itself
        state.deliveries.spawn(async move {
            let _ = dispatched.join().await;
        });
    }

    (StatusCode::OK, "OK\n").into_response()
}

/// GET /debug/vars
async fn debug_vars(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    Json(state.dispatcher.registry().expvar_json())
}

/// GET /metrics
async fn metrics(State(state): State<Arc<ServerState>>) -> Response {
    match state.dispatcher.registry().prometheus_text() {
        Ok(text) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn ping() -> &'static str {
    "pong\n"
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
