//! Reasoning provider configuration.

use crate::reasoning::RetryPolicy;
use std::time::Duration;
use url::Url;

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
    /// Ollama `/api/generate`.
    Ollama,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: Url,
    pub model: String,
    pub api_key: Option<String>,
}

/// Reasoning client configuration.
///
/// The first provider is the primary and gets the full retry policy; every
/// following provider is a single-attempt fallback.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub providers: Vec<ProviderConfig>,
    pub retry: RetryPolicy,
    /// Wall-clock limit for a single provider call.
    pub timeout: Duration,
}
