//! Event subscribers and the table that routes event types to them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::types::WebhookEvent;

/// Key that matches every event type without a type-specific list.
pub const WILDCARD: &str = "*";

/// Consumer of distributed events.
///
/// Called from a worker. `cancel` fires when the event's distribution
/// timeout expires; implementations doing slow work should watch it.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    async fn on_event(&self, event: &WebhookEvent, cancel: &CancellationToken)
        -> anyhow::Result<()>;
}

/// Subscriber backed by an async closure.
pub struct FnSubscriber<F> {
    name: String,
    handler: F,
}

impl<F, Fut> FnSubscriber<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> Subscriber for FnSubscriber<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: &WebhookEvent, _cancel: &CancellationToken) -> anyhow::Result<()> {
        (self.handler)(event.clone()).await
    }
}

/// Logs every event it receives. The binary registers it on the wildcard.
pub struct LogSubscriber;

#[async_trait]
impl Subscriber for LogSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_event(&self, event: &WebhookEvent, _cancel: &CancellationToken) -> anyhow::Result<()> {
        info!(
            provider = %event.provider,
            event_type = %event.event_type,
            action = %event.action,
            delivery_id = %event.delivery_id,
            repository = event.repository_name().unwrap_or("-"),
            sender = event.sender_name().unwrap_or("-"),
            "webhook event"
        );
        Ok(())
    }
}

/// Event type (or [`WILDCARD`]) to subscribers, in registration order.
/// Append-only.
#[derive(Default)]
pub struct SubscriptionTable {
    entries: HashMap<String, Vec<Arc<dyn Subscriber>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, event_type: impl Into<String>, subscriber: Arc<dyn Subscriber>) {
        self.entries
            .entry(event_type.into())
            .or_default()
            .push(subscriber);
    }

    /// Subscribers for `event_type`. The wildcard list is used only when no
    /// list exists for the exact type.
    pub fn matching(&self, event_type: &str) -> Vec<Arc<dyn Subscriber>> {
        match self.entries.get(event_type) {
            Some(list) => list.clone(),
            None => self.entries.get(WILDCARD).cloned().unwrap_or_default(),
        }
    }

    /// Total registrations across all keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
