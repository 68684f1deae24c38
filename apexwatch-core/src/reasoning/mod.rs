//! Reasoning client: asks a language model to analyze an event.
//!
//! Providers are tried in configuration order. The first one is retried with
//! backoff, the rest are single-shot fallbacks.

mod ollama;
mod openai;
pub mod prompt;
mod provider;
mod retry;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{Completion, Provider, ProviderError};
pub use retry::RetryPolicy;

use crate::config::{ProviderKind, ReasoningConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// Outcome of a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub analysis_text: String,
    pub provider_used: String,
    pub tokens_used: i64,
    /// Wall time including retries and fallbacks.
    pub latency_ms: i64,
}

/// Last error seen from one provider.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub attempts: u32,
    pub error: ProviderError,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no reasoning providers configured")]
    NoProviders,

    #[error("all reasoning providers failed: {}", describe(.0))]
    Exhausted(Vec<ProviderFailure>),
}

fn describe(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} after {} attempt(s): {}", f.provider, f.attempts, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct ReasoningClient {
    providers: Vec<Arc<dyn Provider>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ReasoningClient {
    pub fn new(providers: Vec<Arc<dyn Provider>>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            providers,
            retry,
            timeout,
        }
    }

    pub fn from_config(config: &ReasoningConfig) -> Self {
        let http = reqwest::Client::new();
        let providers = config
            .providers
            .iter()
            .map(|p| -> Arc<dyn Provider> {
                match p.kind {
                    ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                        http.clone(),
                        p.base_url.clone(),
                        p.model.clone(),
                        p.api_key.clone(),
                    )),
                    ProviderKind::Ollama => Arc::new(OllamaProvider::new(
                        http.clone(),
                        p.base_url.clone(),
                        p.model.clone(),
                    )),
                }
            })
            .collect();
        Self::new(providers, config.retry.clone(), config.timeout)
    }

    /// Analyze an event prompt, with the token's context summary if any.
    pub async fn analyze(
        &self,
        event_prompt: &str,
        context_summary: &str,
    ) -> Result<Analysis, AnalysisError> {
        if self.providers.is_empty() {
            return Err(AnalysisError::NoProviders);
        }

        let full_prompt = prompt::build_full_prompt(event_prompt, context_summary);
        let started = Instant::now();
        let mut failures = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let policy = if index == 0 {
                self.retry.clone()
            } else {
                RetryPolicy::no_retry()
            };

            let mut attempt = 1;
            loop {
                let delay = policy.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                match self.call(provider.as_ref(), &full_prompt).await {
                    Ok(completion) => {
                        let latency_ms =
                            i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
                        info!(
                            provider = %provider.name(),
                            attempt,
                            tokens = completion.tokens_used,
                            latency_ms,
                            "Analysis completed"
                        );
                        return Ok(Analysis {
                            analysis_text: completion.text,
                            provider_used: provider.name(),
                            tokens_used: completion.tokens_used,
                            latency_ms,
                        });
                    }
                    Err(error) => {
                        warn!(
                            provider = %provider.name(),
                            attempt,
                            error = %error,
                            "Reasoning provider failed"
                        );
                        if !policy.has_attempts_remaining(attempt) {
                            failures.push(ProviderFailure {
                                provider: provider.name(),
                                attempts: attempt,
                                error,
                            });
                            break;
                        }
                        attempt += 1;
                    }
                }
            }
        }

        Err(AnalysisError::Exhausted(failures))
    }

    async fn call(&self, provider: &dyn Provider, prompt: &str) -> Result<Completion, ProviderError> {
        match tokio::time::timeout(self.timeout, provider.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }
}
