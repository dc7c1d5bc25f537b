//! Error types for the gateway.
//!
//! Anything detected before an event is enqueued is a [`WebhookError`] and is
//! returned to the sender as an HTTP status. Anything detected afterwards is a
//! [`DistributionError`], which is only logged. Lifecycle failures are
//! [`ServerError`]s and go to the operator.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;

/// Errors that reject a delivery before it is enqueued.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No adapter is registered under the requested provider name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The provider is registered but disabled in configuration.
    #[error("provider disabled: {0}")]
    ProviderDisabled(String),

    /// The body is not a JSON object.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A secret is configured, signatures are required and none was sent.
    #[error("missing signature header")]
    MissingSignature,

    /// The signature or token does not match the configured secret.
    #[error("invalid signature")]
    SignatureInvalid,

    /// A configured extra header is absent or has a different value.
    #[error("header mismatch: {0}")]
    HeaderMismatch(String),

    /// The event queue is full.
    #[error("event queue saturated")]
    QueueSaturated,

    /// The event queue no longer accepts events (server stopping).
    #[error("event queue closed")]
    QueueClosed,
}

impl WebhookError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownProvider(_) | Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::ProviderDisabled(_) => StatusCode::NOT_FOUND,
            Self::MissingSignature | Self::SignatureInvalid | Self::HeaderMismatch(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::QueueSaturated | Self::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label used in logs and the stats breakdown.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "unknown_provider",
            Self::ProviderDisabled(_) => "provider_disabled",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::MissingSignature => "missing_signature",
            Self::SignatureInvalid => "signature_invalid",
            Self::HeaderMismatch(_) => "header_mismatch",
            Self::QueueSaturated => "queue_saturated",
            Self::QueueClosed => "queue_closed",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        // Fixed bodies: never echo payload fragments, header values or secrets.
        let body = match &self {
            Self::UnknownProvider(_) => "Unknown provider",
            Self::ProviderDisabled(_) => "Not Found",
            Self::MalformedPayload(_) => "Invalid payload",
            Self::MissingSignature => "Missing signature",
            Self::SignatureInvalid => "Invalid signature",
            Self::HeaderMismatch(_) => "Unauthorized",
            Self::QueueSaturated => "Event queue full",
            Self::QueueClosed => "Shutting down",
        };
        (self.status_code(), body).into_response()
    }
}

/// One subscriber that failed while handling an event.
#[derive(Debug)]
pub struct SubscriberFailure {
    pub subscriber: String,
    pub error: anyhow::Error,
}

/// Failures collected while distributing one already-accepted event.
#[derive(Debug, Default)]
pub struct DistributionError {
    /// Error returned by the plugin dispatcher itself.
    pub dispatcher: Option<anyhow::Error>,
    pub subscribers: Vec<SubscriberFailure>,
}

impl DistributionError {
    pub fn is_empty(&self) -> bool {
        self.dispatcher.is_none() && self.subscribers.is_empty()
    }

    /// Names of the subscribers that failed, in invocation order.
    pub fn failed_subscribers(&self) -> Vec<&str> {
        self.subscribers
            .iter()
            .map(|f| f.subscriber.as_str())
            .collect()
    }
}

impl fmt::Display for DistributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "distribution failed")?;
        if let Some(e) = &self.dispatcher {
            write!(f, "; dispatcher: {e}")?;
        }
        for failure in &self.subscribers {
            write!(f, "; {}: {}", failure.subscriber, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DistributionError {}

/// Lifecycle errors surfaced to whoever starts and stops the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,

    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(std::time::Duration),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
