//! Configuration module for apexwatch-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::{FileConfig, ProviderConfig as FileProviderConfig};
use apexwatch_core::config::{
    ContextConfig, ProducersConfig, ProviderConfig, ProviderKind, QueueConfig, ReasoningConfig,
    ServerConfig, SharedConfig,
};
use apexwatch_core::reasoning::RetryPolicy;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub context: ContextConfig,
    /// `None` when the purge task is disabled.
    pub purge_interval: Option<Duration>,
    pub reasoning: ReasoningConfig,
    pub producers: ProducersConfig,
}

impl LoadedConfig {
    /// Wrap the reloadable sections for sharing with request handlers.
    pub fn shared(&self) -> SharedConfig {
        SharedConfig::new(self.server.clone())
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
    access_key_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        access_key_override: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            access_key_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        self.build(file_config, |name| std::env::var(name).ok())
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn build(
        &self,
        mut file_config: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(key) = &self.access_key_override {
            file_config.server.access_key = key.clone();
        }

        validate(&file_config)?;

        let providers = file_config
            .reasoning
            .providers
            .iter()
            .map(|p| convert_provider(p, &env))
            .collect::<Result<Vec<_>, _>>()?;

        let reasoning = &file_config.reasoning;
        let retry = RetryPolicy::default()
            .with_max_attempts(reasoning.max_attempts)
            .with_initial_interval(Duration::from_secs(reasoning.initial_backoff_secs))
            .with_max_interval(Duration::from_secs(reasoning.max_backoff_secs));

        let producers = &file_config.producers;
        let context = &file_config.context;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
                access_key: file_config.server.access_key.clone(),
            },
            queue: QueueConfig {
                poll_interval: Duration::from_millis(file_config.queue.poll_interval_ms),
                failure_pause: Duration::from_secs(file_config.queue.failure_pause_secs),
                visibility_timeout: Duration::from_secs(file_config.queue.visibility_timeout_secs),
            },
            context: ContextConfig {
                staleness_window: Duration::from_secs(context.staleness_window_secs),
                max_summary_bytes: context.max_summary_bytes,
                retention: Duration::from_secs(context.retention_secs),
                excerpt_chars: context.excerpt_chars,
            },
            purge_interval: (context.purge_interval_secs > 0)
                .then(|| Duration::from_secs(context.purge_interval_secs)),
            reasoning: ReasoningConfig {
                providers,
                retry,
                timeout: Duration::from_secs(reasoning.timeout_secs),
            },
            producers: ProducersConfig {
                exchange_monitor_url: parse_url("exchange_monitor_url", &producers.exchange_monitor_url)?,
                news_monitor_url: parse_url("news_monitor_url", &producers.news_monitor_url)?,
                wallet_monitor_url: parse_url("wallet_monitor_url", &producers.wallet_monitor_url)?,
                access_key: file_config.server.access_key,
                timeout: Duration::from_secs(producers.timeout_secs),
            },
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.server.access_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "server.access_key must be set".to_string(),
        ));
    }
    if config.reasoning.providers.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one reasoning provider is required".to_string(),
        ));
    }
    for provider in &config.reasoning.providers {
        if provider.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "reasoning provider model must not be empty".to_string(),
            ));
        }
    }
    if config.reasoning.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "reasoning.max_attempts must be at least 1".to_string(),
        ));
    }
    let timeouts = [
        ("reasoning.timeout_secs", config.reasoning.timeout_secs),
        ("producers.timeout_secs", config.producers.timeout_secs),
        ("queue.visibility_timeout_secs", config.queue.visibility_timeout_secs),
        ("queue.poll_interval_ms", config.queue.poll_interval_ms),
        ("context.retention_secs", config.context.retention_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be positive"
            )));
        }
    }
    if config.context.max_summary_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "context.max_summary_bytes must be positive".to_string(),
        ));
    }
    Ok(())
}

fn convert_provider(
    p: &FileProviderConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<ProviderConfig, ConfigError> {
    let (kind, default_base) = match p.kind {
        file::ProviderKind::OpenAi => (ProviderKind::OpenAi, OPENAI_DEFAULT_BASE_URL),
        file::ProviderKind::Ollama => (ProviderKind::Ollama, OLLAMA_DEFAULT_BASE_URL),
    };
    let base_url = match &p.base_url {
        Some(url) => url.clone(),
        None => parse_url("base_url", default_base)?,
    };

    // An inline key wins over the environment.
    let api_key = p
        .api_key
        .clone()
        .or_else(|| p.api_key_env.as_deref().and_then(env));
    if kind == ProviderKind::OpenAi && api_key.is_none() {
        tracing::warn!(model = %p.model, "OpenAI provider has no API key, its calls will fail");
    }

    Ok(ProviderConfig {
        kind,
        base_url,
        model: p.model.clone(),
        api_key,
    })
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::ValidationError(format!("invalid {name} {raw:?}: {e}")))
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[server]
access_key = "secret"

[[reasoning.providers]]
kind = "openai"
model = "gpt-4o-mini"
api_key_env = "TEST_OPENAI_KEY"

[[reasoning.providers]]
kind = "ollama"
model = "llama3"
"#;

    fn loader() -> ConfigLoader {
        ConfigLoader::new("apexwatch.toml", None, None)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_build_with_defaults() {
        let loaded = loader()
            .build(parse(BASE), |name| {
                (name == "TEST_OPENAI_KEY").then(|| "sk-test".to_string())
            })
            .unwrap();

        assert_eq!(loaded.server.access_key, "secret");
        assert_eq!(loaded.producers.access_key, "secret");
        assert_eq!(loaded.queue.failure_pause, Duration::from_secs(5));
        assert_eq!(loaded.context.staleness_window, Duration::from_secs(3600));
        assert_eq!(loaded.purge_interval, Some(Duration::from_secs(3600)));
        assert_eq!(loaded.reasoning.timeout, Duration::from_secs(120));
        assert_eq!(loaded.reasoning.retry.max_attempts, 3);

        let providers = &loaded.reasoning.providers;
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].kind, ProviderKind::OpenAi);
        assert_eq!(providers[0].base_url.as_str(), "https://api.openai.com/v1");
        assert_eq!(providers[0].api_key.as_deref(), Some("sk-test"));
        assert_eq!(providers[1].kind, ProviderKind::Ollama);
        assert_eq!(providers[1].base_url.as_str(), "http://localhost:11434/");
        assert_eq!(providers[1].api_key, None);
        assert_eq!(
            loaded.producers.exchange_monitor_url.as_str(),
            "http://exchange-monitor:8002/"
        );
    }

    #[test]
    fn test_inline_api_key_wins() {
        let config = parse(
            r#"
[server]
access_key = "secret"

[[reasoning.providers]]
kind = "openai"
model = "gpt-4o-mini"
api_key = "inline"
api_key_env = "TEST_OPENAI_KEY"
"#,
        );
        let loaded = loader()
            .build(config, |_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(loaded.reasoning.providers[0].api_key.as_deref(), Some("inline"));
    }

    #[test]
    fn test_overrides_apply() {
        let loader = ConfigLoader::new(
            "apexwatch.toml",
            Some("127.0.0.1:3000".parse().unwrap()),
            Some("override".to_string()),
        );
        let loaded = loader.build(parse(BASE), no_env).unwrap();
        assert_eq!(loaded.server.listen.port(), 3000);
        assert_eq!(loaded.server.access_key, "override");
        assert_eq!(loaded.producers.access_key, "override");
    }

    #[test]
    fn test_missing_access_key_is_rejected() {
        let config = parse(
            r#"
[[reasoning.providers]]
kind = "ollama"
model = "llama3"
"#,
        );
        let err = loader().build(config, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_empty_provider_list_is_rejected() {
        let config = parse(
            r#"
[server]
access_key = "secret"

[reasoning]
providers = []
"#,
        );
        let err = loader().build(config, no_env).unwrap_err();
        assert!(err.to_string().contains("at least one reasoning provider"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = parse(BASE);
        config.reasoning.timeout_secs = 0;
        let err = loader().build(config, no_env).unwrap_err();
        assert!(err.to_string().contains("reasoning.timeout_secs"));
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let mut config = parse(BASE);
        config.context.max_summary_bytes = 0;
        assert!(loader().build(config, no_env).is_err());
    }

    #[test]
    fn test_invalid_producer_url_is_rejected() {
        let mut config = parse(BASE);
        config.producers.news_monitor_url = "not a url".to_string();
        let err = loader().build(config, no_env).unwrap_err();
        assert!(err.to_string().contains("news_monitor_url"));
    }

    #[test]
    fn test_purge_can_be_disabled() {
        let mut config = parse(BASE);
        config.context.purge_interval_secs = 0;
        let loaded = loader().build(config, no_env).unwrap();
        assert_eq!(loaded.purge_interval, None);
    }
}
