//! OpenAI-compatible chat completions.

use super::provider::{Completion, Provider, ProviderError, check_status, endpoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(http: reqwest::Client, base_url: Url, model: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            model,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: i64,
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> String {
        format!("openai-{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = check_status(response).await?.json().await?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(Completion {
            text,
            tokens_used: body.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}
