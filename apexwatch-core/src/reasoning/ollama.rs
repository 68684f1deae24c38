//! Ollama `/api/generate`.

use super::provider::{Completion, Provider, ProviderError, check_status, endpoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: Url,
    model: String,
}

impl OllamaProvider {
    pub fn new(http: reqwest::Client, base_url: Url, model: String) -> Self {
        Self {
            http,
            base_url,
            model,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: i64,
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> String {
        format!("ollama-{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .http
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&request)
            .send()
            .await?;
        let body: GenerateResponse = check_status(response).await?.json().await?;

        Ok(Completion {
            text: body.response,
            tokens_used: body.eval_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(
            reqwest::Client::new(),
            server.uri().parse().unwrap(),
            "llama3".to_string(),
        )
    }

    #[tokio::test]
    async fn test_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(json!({"model": "llama3", "prompt": "hello", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "response": "Looks bullish.",
                "done": true,
                "eval_count": 42
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert_eq!(provider.name(), "ollama-llama3");
        let completion = provider.complete("hello").await.unwrap();
        assert_eq!(completion.text, "Looks bullish.");
        assert_eq!(completion.tokens_used, 42);
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }
}
