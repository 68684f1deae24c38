use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Text produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: i64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response has no completion")]
    EmptyResponse,

    #[error("API key not configured")]
    MissingApiKey,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// A language model endpoint.
#[async_trait]
pub trait Provider: Send + Sync {
    /// `"{provider}-{model}"`, recorded with every analysis.
    fn name(&self) -> String;

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError>;
}

/// Turn a non-2xx response into [`ProviderError::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn endpoint(base: &url::Url, path: &str) -> String {
    format!("{}/{path}", base.as_str().trim_end_matches('/'))
}
