//! Gateway lifecycle and shared state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::dispatcher::PluginDispatcher;
use crate::distributor::Distributor;
use crate::error::ServerError;
use crate::http_server::{self, ServerState};
use crate::provider::{AdapterRegistry, ProviderAdapter};
use crate::queue::EventQueue;
use crate::stats::{Stats, StatsSnapshot};
use crate::subscription::{Subscriber, SubscriptionTable};
use crate::worker::WorkerPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Mutable state shared by request handlers, workers and the lifecycle
/// methods. Reads (adapter lookup, subscriber snapshot) share the lock;
/// registration and status changes take it exclusively.
pub(crate) struct Shared {
    pub adapters: AdapterRegistry,
    pub subscriptions: SubscriptionTable,
    pub dispatcher: Option<Arc<dyn PluginDispatcher>>,
    pub status: ServerStatus,
    pub queue: Arc<EventQueue>,
}

impl Shared {
    pub fn new(queue_size: usize) -> Self {
        Self {
            adapters: AdapterRegistry::new(),
            subscriptions: SubscriptionTable::new(),
            dispatcher: None,
            status: ServerStatus::Stopped,
            queue: Arc::new(EventQueue::new(queue_size)),
        }
    }
}

pub(crate) type SharedState = Arc<RwLock<Shared>>;

/// Handles owned while the server is running.
struct Runtime {
    addr: SocketAddr,
    shutdown: CancellationToken,
    http: JoinHandle<()>,
    workers: WorkerPool,
}

/// Webhook ingestion server.
///
/// Construct once, register extra adapters and subscribers, then `start`.
/// Every instance is independent; nothing is process-global.
pub struct WebhookServer {
    config: Arc<GatewayConfig>,
    state: SharedState,
    stats: Arc<Stats>,
    runtime: Mutex<Option<Runtime>>,
}

impl WebhookServer {
    pub fn new(config: GatewayConfig) -> Self {
        let config = config.normalized();
        Self {
            state: Arc::new(RwLock::new(Shared::new(config.queue_size))),
            config: Arc::new(config),
            stats: Arc::new(Stats::new()),
            runtime: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Register or replace the adapter for `name`.
    pub async fn register_adapter(&self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let name = name.into();
        info!(provider = %name, "adapter registered");
        self.state.write().await.adapters.register(name, adapter);
    }

    /// Subscribe to one event type, or to [`crate::subscription::WILDCARD`].
    pub async fn subscribe(&self, event_type: impl Into<String>, subscriber: Arc<dyn Subscriber>) {
        let event_type = event_type.into();
        info!(event_type = %event_type, subscriber = subscriber.name(), "subscriber registered");
        self.state
            .write()
            .await
            .subscriptions
            .subscribe(event_type, subscriber);
    }

    pub async fn set_dispatcher(&self, dispatcher: Arc<dyn PluginDispatcher>) {
        self.state.write().await.dispatcher = Some(dispatcher);
    }

    pub async fn status(&self) -> ServerStatus {
        self.state.read().await.status
    }

    pub async fn is_running(&self) -> bool {
        self.status().await == ServerStatus::Running
    }

    pub async fn queue_len(&self) -> usize {
        self.state.read().await.queue.len()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.runtime.lock().await.as_ref().map(|rt| rt.addr)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The HTTP routes, usable without a listener (e.g. in tests).
    pub fn router(&self) -> Router {
        http_server::router(ServerState {
            config: self.config.clone(),
            shared: self.state.clone(),
            stats: self.stats.clone(),
        })
    }

    /// Bind the listener and start serving and distributing. Returns the
    /// bound address without waiting for the server to finish.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        if self.config.tls.is_some() {
            return Err(ServerError::Config(
                "TLS must be terminated in front of the gateway".to_string(),
            ));
        }

        let mut runtime = self.runtime.lock().await;
        let queue = {
            let mut st = self.state.write().await;
            if st.status != ServerStatus::Stopped {
                return Err(ServerError::AlreadyRunning);
            }
            st.status = ServerStatus::Starting;
            if st.queue.is_closed() {
                st.queue = Arc::new(EventQueue::new(self.config.queue_size));
            }
            st.queue.clone()
        };

        let bind_addr = self.config.bind_addr();
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(l) => l,
            Err(source) => {
                self.set_status(ServerStatus::Stopped).await;
                return Err(ServerError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };
        let addr = match listener.local_addr() {
            Ok(a) => a,
            Err(source) => {
                self.set_status(ServerStatus::Stopped).await;
                return Err(ServerError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };

        let workers = WorkerPool::spawn(
            self.config.workers,
            queue,
            Arc::new(Distributor::new(self.state.clone())),
            self.config.distribution_timeout(),
            self.stats.clone(),
        );

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let app = self.router();
        let http = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {e}");
            }
        });

        info!(
            %addr,
            workers = workers.size(),
            queue_size = self.config.queue_size,
            prefix = %self.config.path_prefix,
            "webhook gateway started"
        );

        *runtime = Some(Runtime {
            addr,
            shutdown,
            http,
            workers,
        });
        self.set_status(ServerStatus::Running).await;
        Ok(addr)
    }

    /// Stop accepting connections, then close the queue and let workers
    /// drain it. Each phase is bounded by the shutdown timeout.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut runtime = self.runtime.lock().await;
        {
            let mut st = self.state.write().await;
            if st.status != ServerStatus::Running {
                return Err(ServerError::NotRunning);
            }
            st.status = ServerStatus::Stopping;
        }
        let Some(rt) = runtime.take() else {
            self.set_status(ServerStatus::Stopped).await;
            return Err(ServerError::NotRunning);
        };

        let limit = self.config.shutdown_timeout();
        let mut timed_out = false;
        info!(addr = %rt.addr, "webhook gateway stopping");

        rt.shutdown.cancel();
        let mut http = rt.http;
        if tokio::time::timeout(limit, &mut http).await.is_err() {
            warn!("HTTP server did not shut down within {limit:?}, aborting");
            http.abort();
            timed_out = true;
        }

        let queue = self.state.read().await.queue.clone();
        queue.close();
        if tokio::time::timeout(limit, rt.workers.join()).await.is_err() {
            warn!(
                remaining = queue.len(),
                "workers did not drain the queue within {limit:?}"
            );
            timed_out = true;
        }

        self.set_status(ServerStatus::Stopped).await;
        if timed_out {
            return Err(ServerError::ShutdownTimeout(limit));
        }
        info!("webhook gateway stopped");
        Ok(())
    }

    async fn set_status(&self, status: ServerStatus) {
        self.state.write().await.status = status;
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
