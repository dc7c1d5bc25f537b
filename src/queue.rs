//! Bounded FIFO between HTTP handlers and the worker pool.
//!
//! Enqueue never waits: a full queue is reported straight back to the handler
//! so the sender gets a 503. Dequeue waits while the queue is empty. Closing
//! stops new enqueues; buffered events are still handed out until the buffer
//! is empty, after which dequeue returns `None`.

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::WebhookError;
use crate::types::WebhookEvent;

pub struct EventQueue {
    tx: mpsc::Sender<WebhookEvent>,
    rx: Mutex<mpsc::Receiver<WebhookEvent>>,
    capacity: usize,
    closed: CancellationToken,
}

impl EventQueue {
    /// Create a queue. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
            closed: CancellationToken::new(),
        }
    }

    /// Non-blocking enqueue.
    pub fn try_enqueue(&self, event: WebhookEvent) -> Result<(), WebhookError> {
        if self.closed.is_cancelled() {
            return Err(WebhookError::QueueClosed);
        }
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WebhookError::QueueSaturated,
            mpsc::error::TrySendError::Closed(_) => WebhookError::QueueClosed,
        })
    }

    /// Wait for the next event. Returns `None` once the queue is closed and
    /// drained.
    pub async fn dequeue(&self) -> Option<WebhookEvent> {
        let mut rx = self.rx.lock().await;
        if self.closed.is_cancelled() {
            rx.close();
            return rx.recv().await;
        }
        tokio::select! {
            biased;
            event = rx.recv() => event,
            _ = self.closed.cancelled() => {
                rx.close();
                rx.recv().await
            }
        }
    }

    /// Stop accepting events and let consumers drain what is buffered.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Events currently buffered.
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
