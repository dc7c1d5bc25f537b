use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_QUEUE_SIZE: usize = 1000;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_DISTRIBUTION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
/// GitHub caps payloads at 25 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

/// Per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Overrides the global default secret.
    #[serde(default)]
    pub secret: Option<String>,
    /// Event allow-list; empty or containing `*` allows everything.
    #[serde(default)]
    pub events: Vec<String>,
    /// Headers that must be present with exactly these values.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reject unsigned deliveries when a secret is configured.
    #[serde(default)]
    pub require_signature: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            secret: None,
            events: Vec::new(),
            headers: HashMap::new(),
            enabled: true,
            require_signature: false,
        }
    }
}

impl ProviderConfig {
    pub fn allows(&self, event_type: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == "*" || e == event_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix for the webhook routes, e.g. `/hooks`.
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub default_secret: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub queue_size: usize,
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub distribution_timeout_secs: u64,
    #[serde(default)]
    pub shutdown_timeout_secs: u64,
    /// Largest request body accepted on the webhook routes.
    #[serde(default)]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            path_prefix: String::new(),
            default_secret: String::new(),
            providers: HashMap::new(),
            queue_size: DEFAULT_QUEUE_SIZE,
            workers: DEFAULT_WORKERS,
            distribution_timeout_secs: DEFAULT_DISTRIBUTION_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            tls: None,
        }
    }
}

impl GatewayConfig {
    /// Read a JSON config file. Unset sizes and timeouts get their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: GatewayConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(config.normalized())
    }

    /// Replace zero sizes and timeouts with defaults and tidy the path prefix.
    pub fn normalized(mut self) -> Self {
        if self.queue_size == 0 {
            self.queue_size = DEFAULT_QUEUE_SIZE;
        }
        if self.workers == 0 {
            self.workers = DEFAULT_WORKERS;
        }
        if self.distribution_timeout_secs == 0 {
            self.distribution_timeout_secs = DEFAULT_DISTRIBUTION_TIMEOUT_SECS;
        }
        if self.shutdown_timeout_secs == 0 {
            self.shutdown_timeout_secs = DEFAULT_SHUTDOWN_TIMEOUT_SECS;
        }
        if self.max_body_bytes == 0 {
            self.max_body_bytes = DEFAULT_MAX_BODY_BYTES;
        }
        self.path_prefix = normalize_prefix(&self.path_prefix);
        self
    }

    /// Settings for `provider`, defaults when it has no entry.
    pub fn provider(&self, provider: &str) -> ProviderConfig {
        self.providers.get(provider).cloned().unwrap_or_default()
    }

    /// Secret for `provider`; empty means none configured.
    pub fn secret_for(&self, provider: &str) -> &str {
        self.providers
            .get(provider)
            .and_then(|p| p.secret.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_secret.as_str())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn distribution_timeout(&self) -> Duration {
        Duration::from_secs(self.distribution_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// `hooks/`, `/hooks/` and `/hooks` all become `/hooks`; `/` becomes empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.distribution_timeout(), Duration::from_secs(30));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn zero_values_are_normalized() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.queue_size, 0);
        let config = config.normalized();
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.shutdown_timeout_secs, DEFAULT_SHUTDOWN_TIMEOUT_SECS);
        assert_eq!(config.max_body_bytes, 25 * 1024 * 1024);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("hooks"), "/hooks");
        assert_eq!(normalize_prefix("/hooks/"), "/hooks");
        assert_eq!(normalize_prefix("/api/hooks"), "/api/hooks");
    }

    #[test]
    fn secret_resolution() {
        let mut config = GatewayConfig {
            default_secret: "global".into(),
            ..Default::default()
        };
        config.providers.insert(
            "github".into(),
            ProviderConfig {
                secret: Some("gh".into()),
                ..Default::default()
            },
        );
        config.providers.insert(
            "gitlab".into(),
            ProviderConfig {
                secret: Some(String::new()),
                ..Default::default()
            },
        );

        assert_eq!(config.secret_for("github"), "gh");
        assert_eq!(config.secret_for("gitlab"), "global");
        assert_eq!(config.secret_for("bitbucket"), "global");
    }

    #[test]
    fn allow_list() {
        let open = ProviderConfig::default();
        assert!(open.allows("anything"));

        let limited = ProviderConfig {
            events: vec!["push".into(), "pull_request".into()],
            ..Default::default()
        };
        assert!(limited.allows("push"));
        assert!(!limited.allows("issues"));

        let star = ProviderConfig {
            events: vec!["*".into()],
            ..Default::default()
        };
        assert!(star.allows("issues"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "port": 9000,
                "path_prefix": "hooks/",
                "default_secret": "s3cr3t",
                "workers": 2,
                "providers": {{
                    "gitlab": {{"secret": "tok", "events": ["Push Hook"], "enabled": false}},
                    "github": {{"headers": {{"x-env": "prod"}}}}
                }}
            }}"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.path_prefix, "/hooks");
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);

        let gitlab = config.provider("gitlab");
        assert!(!gitlab.enabled);
        assert_eq!(gitlab.events, vec!["Push Hook"]);
        assert_eq!(config.secret_for("gitlab"), "tok");

        let github = config.provider("github");
        assert!(github.enabled);
        assert_eq!(github.headers["x-env"], "prod");
        assert!(config.provider("bitbucket").enabled);
    }

    #[test]
    fn load_errors() {
        assert!(matches!(
            GatewayConfig::load("/nonexistent/gateway.json"),
            Err(ConfigError::Read { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            GatewayConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
