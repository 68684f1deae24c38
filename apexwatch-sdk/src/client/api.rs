//! Core API client (producers and dashboard → core service).
//!
//! Every request carries the shared access key in the `X-Access-Key` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::ACCESS_KEY_HEADER;
use crate::objects::{
    AnalyticsPage, AnalyticsQuery, ContextResponse, EventEnvelope, ListThoughtsQuery,
    QueueStatusResponse, QueuedResponse, ThoughtsPage,
};

/// Typed HTTP client for the ApexWatch core service.
#[derive(Debug, Clone)]
pub struct CoreClient {
    http: Client,
    base_url: Url,
    access_key: String,
}

impl CoreClient {
    /// Create a new `CoreClient`.
    ///
    /// * `base_url`: root URL of the core service (e.g. `http://core-service:8000`).
    /// * `access_key`: the shared access key.
    pub fn new(base_url: Url, access_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            access_key: access_key.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/webhook/event`: enqueue an event for analysis.
    pub async fn submit_event(&self, event: &EventEnvelope) -> Result<QueuedResponse, ClientError> {
        let url = self.base_url.join("/api/webhook/event")?;

        let resp = self
            .http
            .post(url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .json(event)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/queue/status`: number of events waiting to be processed.
    pub async fn queue_status(&self) -> Result<QueueStatusResponse, ClientError> {
        let url = self.base_url.join("/api/queue/status")?;

        let resp = self
            .http
            .get(url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/context/{token_id}`: the token's current rolling context.
    pub async fn context(&self, token_id: &str) -> Result<ContextResponse, ClientError> {
        let path = format!("/api/context/{}", urlencoding::encode(token_id));
        let url = self.base_url.join(&path)?;

        let resp = self
            .http
            .get(url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/thoughts/{token_id}`: analysis history, newest first.
    pub async fn thoughts(
        &self,
        token_id: &str,
        query: &ListThoughtsQuery,
    ) -> Result<ThoughtsPage, ClientError> {
        let path = format!("/api/thoughts/{}", urlencoding::encode(token_id));
        let url = self.base_url.join(&path)?;

        let resp = self
            .http
            .get(url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/analytics/{token_id}`: analytics rows, optionally filtered
    /// by metric name.
    pub async fn analytics(
        &self,
        token_id: &str,
        query: &AnalyticsQuery,
    ) -> Result<AnalyticsPage, ClientError> {
        let path = format!("/api/analytics/{}", urlencoding::encode(token_id));
        let url = self.base_url.join(&path)?;

        let resp = self
            .http
            .get(url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }
}
