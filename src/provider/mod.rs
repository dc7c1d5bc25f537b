//! Provider adapters.
//!
//! An adapter knows one Git host's webhook contract: which headers carry the
//! event type, delivery id and signature, how the signature is checked, and
//! where repository/sender details live in the payload.

mod bitbucket;
mod github;
mod gitlab;
pub mod registry;

pub use bitbucket::BitbucketAdapter;
pub use github::GithubAdapter;
pub use gitlab::GitlabAdapter;
pub use registry::AdapterRegistry;

use axum::http::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::WebhookError;
use crate::extract::Fields;
use crate::types::{RepositoryRef, SenderRef, WebhookEvent};

pub trait ProviderAdapter: Send + Sync {
    /// Check the signature header value against the raw body.
    fn validate_signature(&self, payload: &[u8], signature: &str, secret: &str) -> bool;

    /// Decode a delivery into a normalized event. The `provider` field is
    /// left empty; the ingestion layer stamps it.
    fn parse_event(&self, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, WebhookError>;

    /// Event types this provider is known to send. Advisory only.
    fn supported_events(&self) -> Vec<String>;

    /// Header names that may carry the signature or token, in priority order.
    fn signature_headers(&self) -> &[&str];
}

/// First candidate header that is present with a non-empty value.
pub fn first_header<'a>(headers: &'a HeaderMap, candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    })
}

/// Snapshot of the request headers, first value per name.
pub fn header_snapshot(headers: &HeaderMap) -> HashMap<String, String> {
    let mut snapshot = HashMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            snapshot.insert(name.as_str().to_string(), value.to_string());
        }
    }
    snapshot
}

/// Decode a body that must be a JSON object.
pub fn decode_object(body: &[u8]) -> Result<Value, WebhookError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
    if !value.is_object() {
        return Err(WebhookError::MalformedPayload(
            "payload is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Header names an adapter reads, consulted through [`first_header`].
pub struct HeaderSet {
    pub event: &'static [&'static str],
    pub delivery: &'static [&'static str],
    pub signature: &'static [&'static str],
}

/// Shared tail of every built-in `parse_event`: decode, read the header set,
/// run the adapter's extractors, then move the payload into the event.
pub(crate) fn build_event(
    headers: &HeaderMap,
    body: &[u8],
    set: &HeaderSet,
    action: fn(&Fields<'_>) -> String,
    repository: fn(&Fields<'_>) -> Option<RepositoryRef>,
    sender: fn(&Fields<'_>) -> Option<SenderRef>,
) -> Result<WebhookEvent, WebhookError> {
    let value = decode_object(body)?;
    let fields = Fields::new(&value);

    let action = action(&fields);
    let repository = repository(&fields);
    let sender = sender(&fields);

    let data = match value {
        Value::Object(map) => map,
        _ => return Err(WebhookError::MalformedPayload("payload is not a JSON object".into())),
    };

    let event_type = first_header(headers, set.event).unwrap_or_default();
    let delivery_id = first_header(headers, set.delivery).unwrap_or_default();

    let mut event = WebhookEvent::new(event_type, data);
    event.id = delivery_id.to_string();
    event.delivery_id = delivery_id.to_string();
    event.signature = first_header(headers, set.signature)
        .unwrap_or_default()
        .to_string();
    event.action = action;
    event.repository = repository;
    event.sender = sender;
    event.headers = header_snapshot(headers);
    Ok(event)
}
