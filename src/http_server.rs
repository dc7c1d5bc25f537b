use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::WebhookError;
use crate::provider::first_header;
use crate::server::{ServerStatus, SharedState};
use crate::stats::{Stats, StatsSnapshot};

#[derive(Clone)]
pub(crate) struct ServerState {
    pub config: Arc<GatewayConfig>,
    pub shared: SharedState,
    pub stats: Arc<Stats>,
}

/// Webhook routes (under the configured prefix) plus `/health` and `/metrics`.
pub(crate) fn router(state: ServerState) -> Router {
    let hooks = Router::new()
        .route("/webhook/{provider}", post(handle_webhook))
        .route("/github", post(handle_github))
        .route("/gitlab", post(handle_gitlab))
        .route("/bitbucket", post(handle_bitbucket))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes));

    let prefix = state.config.path_prefix.clone();
    let hooks = if prefix.is_empty() {
        hooks
    } else {
        Router::new().nest(&prefix, hooks)
    };

    hooks
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<String>,
}

enum Outcome {
    Queued { receipt: String },
    Ignored,
}

async fn handle_webhook(
    Path(provider): Path<String>,
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(&state, &provider, &headers, &body).await
}

async fn handle_github(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Response {
    ingest(&state, "github", &headers, &body).await
}

async fn handle_gitlab(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Response {
    ingest(&state, "gitlab", &headers, &body).await
}

async fn handle_bitbucket(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(&state, "bitbucket", &headers, &body).await
}

async fn ingest(state: &ServerState, provider: &str, headers: &HeaderMap, body: &[u8]) -> Response {
    state.stats.record_received();

    match accept(state, provider, headers, body).await {
        Ok(Outcome::Queued { receipt }) => {
            state.stats.record_accepted();
            let body = IngestResponse {
                status: "accepted",
                receipt: Some(receipt),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Outcome::Ignored) => {
            state.stats.record_ignored();
            let body = IngestResponse {
                status: "ignored",
                receipt: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            match e {
                WebhookError::QueueSaturated | WebhookError::QueueClosed => {
                    state.stats.record_dropped()
                }
                _ => state.stats.record_rejected(),
            }
            warn!(provider, reason = e.kind(), "webhook rejected: {e}");
            e.into_response()
        }
    }
}

/// Everything between the raw request and the queue. Any error here is
/// reported to the sender.
async fn accept(
    state: &ServerState,
    provider: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Outcome, WebhookError> {
    let (adapter, queue) = {
        let st = state.shared.read().await;
        let adapter = st
            .adapters
            .get(provider)
            .ok_or_else(|| WebhookError::UnknownProvider(provider.to_string()))?;
        (adapter, st.queue.clone())
    };

    let settings = state.config.provider(provider);
    if !settings.enabled {
        return Err(WebhookError::ProviderDisabled(provider.to_string()));
    }

    let mut event = adapter.parse_event(headers, body)?;

    let secret = state.config.secret_for(provider);
    match first_header(headers, adapter.signature_headers()) {
        Some(signature) => {
            if !adapter.validate_signature(body, signature, secret) {
                return Err(WebhookError::SignatureInvalid);
            }
        }
        None => {
            if settings.require_signature && !secret.is_empty() {
                return Err(WebhookError::MissingSignature);
            }
        }
    }

    for (name, expected) in &settings.headers {
        let actual = headers.get(name.as_str()).and_then(|v| v.to_str().ok());
        if actual != Some(expected.as_str()) {
            return Err(WebhookError::HeaderMismatch(name.clone()));
        }
    }

    if !settings.allows(&event.event_type) {
        debug!(provider, event_type = %event.event_type, "event type not enabled, ignoring");
        return Ok(Outcome::Ignored);
    }

    event.provider = provider.to_string();
    event.timestamp = Utc::now();
    let event_type = event.event_type.clone();
    let delivery_id = event.delivery_id.clone();

    queue.try_enqueue(event)?;

    let receipt = Uuid::new_v4().to_string();
    info!(
        provider,
        event_type = %event_type,
        delivery_id = %delivery_id,
        receipt = %receipt,
        queue_length = queue.len(),
        "webhook accepted"
    );
    Ok(Outcome::Queued { receipt })
}

// ─── Health & metrics ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    running: bool,
    queue_length: usize,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    status: ServerStatus,
    running: bool,
    queue_length: usize,
    queue_capacity: usize,
    adapters: usize,
    providers: Vec<String>,
    subscribers: usize,
    workers: usize,
    events: StatsSnapshot,
}

async fn handle_health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let st = state.shared.read().await;
    let running = st.status == ServerStatus::Running;
    Json(HealthResponse {
        status: if running { "ok" } else { "stopped" },
        running,
        queue_length: st.queue.len(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn handle_metrics(State(state): State<ServerState>) -> Json<MetricsResponse> {
    let st = state.shared.read().await;
    Json(MetricsResponse {
        status: st.status,
        running: st.status == ServerStatus::Running,
        queue_length: st.queue.len(),
        queue_capacity: st.queue.capacity(),
        adapters: st.adapters.len(),
        providers: st.adapters.names(),
        subscribers: st.subscriptions.len(),
        workers: state.config.workers,
        events: state.stats.snapshot(),
    })
}

#[cfg(test)]
#[path = "http_server_tests.rs"]
mod tests;
