//! TOML file configuration structures.
//!
//! These structs directly map to the `apexwatch.toml` file format. Every
//! field except the reasoning provider list has a default.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub context: ContextConfig,
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub producers: ProducersConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Shared key for the `/api` routes and the producer services.
    #[serde(default)]
    pub access_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            access_key: String::new(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000))
}

/// Consumer loop timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub poll_interval_ms: u64,
    pub failure_pause_secs: u64,
    pub visibility_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            failure_pause_secs: 5,
            visibility_timeout_secs: 600,
        }
    }
}

/// Per-token context lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub staleness_window_secs: u64,
    pub max_summary_bytes: usize,
    pub retention_secs: u64,
    pub excerpt_chars: usize,
    /// How often expired contexts are deleted. `0` disables the purge task.
    pub purge_interval_secs: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: 60 * 60,
            max_summary_bytes: 500 * 1024,
            retention_secs: 24 * 60 * 60,
            excerpt_chars: 200,
            purge_interval_secs: 60 * 60,
        }
    }
}

/// Reasoning section. Providers are tried in the order listed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    pub providers: Vec<ProviderConfig>,
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_reasoning_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    2
}

fn default_max_backoff() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

/// One `[[reasoning.providers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Defaults to the public OpenAI API or a local Ollama.
    pub base_url: Option<Url>,
    pub model: String,
    pub api_key: Option<String>,
    /// Name of an environment variable holding the API key.
    pub api_key_env: Option<String>,
}

/// Producer services queried for enrichment snapshots. URLs are checked
/// when the file is loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducersConfig {
    pub exchange_monitor_url: String,
    pub news_monitor_url: String,
    pub wallet_monitor_url: String,
    pub timeout_secs: u64,
}

impl Default for ProducersConfig {
    fn default() -> Self {
        Self {
            exchange_monitor_url: "http://exchange-monitor:8002".to_string(),
            news_monitor_url: "http://news-monitor:8003".to_string(),
            wallet_monitor_url: "http://wallet-monitor:8001".to_string(),
            timeout_secs: 5,
        }
    }
}
