use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Provider-agnostic repository reference. Fields the provider payload does
/// not carry stay at their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub url: String,
    pub clone_url: String,
    pub private: bool,
}

/// Provider-agnostic reference to the account that triggered a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
}

/// A normalized webhook delivery.
///
/// Built by a provider adapter, stamped with `provider` and `timestamp` by the
/// ingestion layer, then consumed by exactly one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Provider delivery identifier, empty when the provider sent none.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub action: String,
    pub provider: String,
    pub repository: Option<RepositoryRef>,
    pub sender: Option<SenderRef>,
    /// Full decoded payload.
    pub data: Map<String, Value>,
    /// First value per request header, keyed by lowercase header name.
    pub headers: HashMap<String, String>,
    /// Ingestion time.
    pub timestamp: DateTime<Utc>,
    pub signature: String,
    pub delivery_id: String,
}

impl WebhookEvent {
    pub fn new(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            event_type: event_type.into(),
            action: String::new(),
            provider: String::new(),
            repository: None,
            sender: None,
            data,
            headers: HashMap::new(),
            timestamp: Utc::now(),
            signature: String::new(),
            delivery_id: String::new(),
        }
    }

    /// Full name of the repository, if one was extracted.
    pub fn repository_name(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .map(|r| r.full_name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.sender
            .as_ref()
            .map(|s| s.username.as_str())
            .filter(|n| !n.is_empty())
    }
}
