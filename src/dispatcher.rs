//! Interface to the plugin host that runs internal plugins for each event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::WebhookEvent;

/// Input shape the plugin host understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub event_type: String,
    pub action: String,
    pub provider: String,
    pub delivery_id: String,
    pub repository: Option<String>,
    pub sender: Option<String>,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl From<&WebhookEvent> for DispatchRequest {
    fn from(event: &WebhookEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            action: event.action.clone(),
            provider: event.provider.clone(),
            delivery_id: event.delivery_id.clone(),
            repository: event.repository_name().map(str::to_string),
            sender: event.sender_name().map(str::to_string),
            payload: Value::Object(event.data.clone()),
            received_at: event.timestamp,
        }
    }
}

/// Result of one plugin run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOutcome {
    pub plugin: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PluginOutcome {
    pub fn ok(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            success: true,
            message: None,
        }
    }

    pub fn failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            success: false,
            message: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait PluginDispatcher: Send + Sync {
    /// Run every interested plugin. An `Err` means the dispatch itself failed;
    /// individual plugin failures are reported through the outcomes.
    async fn dispatch(&self, request: DispatchRequest) -> anyhow::Result<Vec<PluginOutcome>>;
}
