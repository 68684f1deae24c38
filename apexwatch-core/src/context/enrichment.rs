//! Snapshots fetched from the producer services when a context is stale.

use crate::config::ProducersConfig;
use crate::events::EventKind;
use apexwatch_sdk::ACCESS_KEY_HEADER;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Which producer to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentSource {
    Market,
    News,
    Wallet,
}

impl EnrichmentSource {
    /// Price and volume events read the market, news reads news, transfers
    /// read wallet activity. Anything else has no source.
    pub fn for_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::PriceChange | EventKind::VolumeSpike => Some(Self::Market),
            EventKind::NewsUpdate => Some(Self::News),
            EventKind::WalletTransfer => Some(Self::Wallet),
            EventKind::Unknown => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Market => "Latest Market:",
            Self::News => "Recent News:",
            Self::Wallet => "Wallet Activity:",
        }
    }
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Best effort. Any failure is `None`.
    async fn fetch(&self, source: EnrichmentSource, token_id: &str) -> Option<String>;
}

/// Never fetches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl Enricher for NoEnrichment {
    async fn fetch(&self, _source: EnrichmentSource, _token_id: &str) -> Option<String> {
        None
    }
}

/// Queries the producers' HTTP APIs.
#[derive(Debug, Clone)]
pub struct HttpEnricher {
    http: reqwest::Client,
    config: ProducersConfig,
}

impl HttpEnricher {
    /// Fails if the HTTP client cannot be built; every request must carry
    /// the configured timeout.
    pub fn new(config: ProducersConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, source: EnrichmentSource, token_id: &str) -> String {
        let (base, path) = match source {
            EnrichmentSource::Market => (&self.config.exchange_monitor_url, "api/market/latest"),
            EnrichmentSource::News => (&self.config.news_monitor_url, "api/news/recent"),
            EnrichmentSource::Wallet => (&self.config.wallet_monitor_url, "api/wallets/summary"),
        };
        format!(
            "{}/{path}/{}",
            trimmed(base),
            urlencoding::encode(token_id)
        )
    }
}

fn trimmed(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn fetch(&self, source: EnrichmentSource, token_id: &str) -> Option<String> {
        let url = self.endpoint(source, token_id);
        let response = match self
            .http
            .get(&url)
            .header(ACCESS_KEY_HEADER, &self.config.access_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(token_id, ?source, error = %e, "Failed to reach producer");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(token_id, ?source, status = %response.status(), "Producer returned an error");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(body.to_string()),
            Err(e) => {
                warn!(token_id, ?source, error = %e, "Producer returned an unreadable body");
                None
            }
        }
    }
}
