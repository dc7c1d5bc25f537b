//! Fan-out of one dequeued event to the plugin dispatcher and subscribers.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatcher::DispatchRequest;
use crate::error::{DistributionError, SubscriberFailure};
use crate::server::SharedState;
use crate::types::WebhookEvent;

pub struct Distributor {
    state: SharedState,
}

impl Distributor {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Deliver `event` once. The dispatcher runs first; its failure does not
    /// stop subscribers, and one subscriber's failure does not stop the next.
    pub async fn distribute(
        &self,
        event: &WebhookEvent,
        cancel: &CancellationToken,
    ) -> Result<(), DistributionError> {
        // Snapshot under the read lock so slow consumers never hold it.
        let (dispatcher, subscribers) = {
            let st = self.state.read().await;
            (
                st.dispatcher.clone(),
                st.subscriptions.matching(&event.event_type),
            )
        };

        let mut failures = DistributionError::default();

        if let Some(dispatcher) = dispatcher {
            match dispatcher.dispatch(DispatchRequest::from(event)).await {
                Ok(outcomes) => {
                    for outcome in outcomes.iter().filter(|o| !o.success) {
                        warn!(
                            plugin = %outcome.plugin,
                            event_type = %event.event_type,
                            delivery_id = %event.delivery_id,
                            message = outcome.message.as_deref().unwrap_or(""),
                            "plugin failed"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        event_type = %event.event_type,
                        delivery_id = %event.delivery_id,
                        "plugin dispatch failed: {e:#}"
                    );
                    failures.dispatcher = Some(e);
                }
            }
        }

        for subscriber in subscribers {
            let name = subscriber.name().to_string();
            match subscriber.on_event(event, cancel).await {
                Ok(()) => debug!(subscriber = %name, event_type = %event.event_type, "delivered"),
                Err(error) => {
                    warn!(
                        subscriber = %name,
                        event_type = %event.event_type,
                        delivery_id = %event.delivery_id,
                        "subscriber failed: {error:#}"
                    );
                    failures.subscribers.push(SubscriberFailure {
                        subscriber: name,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

#[cfg(test)]
#[path = "distributor_tests.rs"]
mod tests;
