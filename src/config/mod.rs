use crate::services::dispatcher::RetryPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Per outbound request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Global cap on concurrent outbound deliveries.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Bytes of response body kept on each delivery row.
    #[serde(default = "default_response_body_limit")]
    pub response_body_limit: usize,
    #[serde(default = "default_true")]
    pub require_https: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_in_flight: default_max_in_flight(),
            queue_capacity: default_queue_capacity(),
            response_body_limit: default_response_body_limit(),
            require_https: true,
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per delivery; 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self
                .backoff_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretsConfig {
    /// Base64 32-byte key for secrets at rest. `GREENLEAF_SECRET_KEY` wins.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/greenleaf.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    64
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_response_body_limit() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("Greenleaf-Webhooks/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![1_000, 5_000, 30_000]
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run `greenleaf init` to create one.",
                path.display(),
                e
            )
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let hooks = &self.webhooks;
        if hooks.timeout_secs == 0 {
            anyhow::bail!("webhooks.timeout_secs must be greater than 0");
        }
        if hooks.max_in_flight == 0 {
            anyhow::bail!("webhooks.max_in_flight must be greater than 0");
        }
        if hooks.queue_capacity == 0 {
            anyhow::bail!("webhooks.queue_capacity must be greater than 0");
        }
        if hooks.retry.max_attempts == 0 || hooks.retry.max_attempts > 10 {
            anyhow::bail!("webhooks.retry.max_attempts must be between 1 and 10");
        }
        if hooks.retry.backoff_ms.is_empty() {
            anyhow::bail!("webhooks.retry.backoff_ms must list at least one delay");
        }
        if self.api.max_page_size == 0 || self.api.max_page_size > 1000 {
            anyhow::bail!("api.max_page_size must be between 1 and 1000");
        }
        if self.api.default_page_size == 0 || self.api.default_page_size > self.api.max_page_size {
            anyhow::bail!("api.default_page_size must be between 1 and api.max_page_size");
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        Ok(())
    }

    /// Starter config written by `greenleaf init`.
    pub fn starter_toml(secret_key: &str) -> String {
        format!(
            r#"[server]
host = "127.0.0.1"
port = 3000

[database]
path = "data/greenleaf.db"
pool_size = 10

[webhooks]
timeout_secs = 10
max_in_flight = 64
queue_capacity = 1024
response_body_limit = 1024
require_https = true

[webhooks.retry]
max_attempts = 3
backoff_ms = [1000, 5000, 30000]

[secrets]
# Prefer GREENLEAF_SECRET_KEY in production.
key = "{}"

[api]
default_page_size = 20
max_page_size = 100
"#,
            secret_key
        )
    }
}
