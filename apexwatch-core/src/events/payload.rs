//! Typed payloads, one per event kind.
//!
//! Every field is optional; see [`super::lenient`].

use super::lenient::{self, Numeric};
use serde::Deserialize;

/// Significant price move on an exchange.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PriceChange {
    #[serde(default, deserialize_with = "lenient::text")]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub old_price: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub new_price: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub change_percent: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub volume: Option<Numeric>,
}

/// Trading volume jump on an exchange.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VolumeSpike {
    #[serde(default, deserialize_with = "lenient::text")]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub old_volume: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub new_volume: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub increase_percent: Option<Numeric>,
}

/// Large on-chain transfer involving a monitored token.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WalletTransfer {
    #[serde(default, deserialize_with = "lenient::text")]
    pub from_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub to_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub tx_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub timestamp: Option<String>,
}

/// News article judged relevant to a token.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewsUpdate {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub relevance_score: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sentiment_score: Option<Numeric>,
}
