use serde::Deserialize;

use crate::services::validation::MAX_BATCH_BYTES;
use crate::services::workflow::NavigationPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the utility REST backend (e.g., "http://imovel:8080/backend-imovel")
    pub backend_base_url: String,

    /// Service bearer token attached to every backend request
    #[serde(default)]
    pub backend_token: Option<String>,

    /// Backend request timeout in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// HS256 secret of the back-office login tokens
    pub jwt_secret: String,

    /// Redis connection string for table state. In-memory store when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Upper bound on the summed size of one upload batch
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: u64,

    /// Lifetime of user notifications in milliseconds
    #[serde(default = "default_message_lifetime_ms")]
    pub message_lifetime_ms: u64,

    /// Seconds without a request after which a user's workflow session is dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// `free` or `gated`
    #[serde(default)]
    pub step_navigation: NavigationPolicy,
}

/// Settings of the status watcher binary. It only talks to the backend, so
/// it needs no login secret or store.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    pub backend_base_url: String,

    #[serde(default)]
    pub backend_token: Option<String>,

    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    30
}

fn default_max_batch_bytes() -> u64 {
    MAX_BATCH_BYTES
}

fn default_message_lifetime_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

impl WatcherConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
