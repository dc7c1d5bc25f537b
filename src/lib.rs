//! Webhook ingestion gateway for GitHub, GitLab and Bitbucket.
//!
//! Deliveries are verified, normalized into a [`WebhookEvent`] and pushed onto
//! a bounded queue. A fixed worker pool drains the queue and hands each event
//! to the plugin dispatcher and to every matching [`Subscriber`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use nexus_webhook_gateway::{GatewayConfig, LogSubscriber, WebhookServer, WILDCARD};
//!
//! # async fn run() -> Result<(), nexus_webhook_gateway::ServerError> {
//! let server = WebhookServer::new(GatewayConfig::default());
//! server.subscribe(WILDCARD, Arc::new(LogSubscriber)).await;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod distributor;
pub mod error;
pub mod extract;
mod http_server;
pub mod provider;
pub mod queue;
pub mod server;
pub mod stats;
pub mod subscription;
pub mod types;
pub mod verification;
pub mod worker;

pub use config::{GatewayConfig, ProviderConfig, TlsConfig};
pub use dispatcher::{DispatchRequest, PluginDispatcher, PluginOutcome};
pub use error::{ConfigError, DistributionError, ServerError, SubscriberFailure, WebhookError};
pub use provider::{AdapterRegistry, BitbucketAdapter, GithubAdapter, GitlabAdapter, ProviderAdapter};
pub use server::{ServerStatus, WebhookServer};
pub use stats::StatsSnapshot;
pub use subscription::{FnSubscriber, LogSubscriber, Subscriber, WILDCARD};
pub use types::{RepositoryRef, SenderRef, WebhookEvent};
