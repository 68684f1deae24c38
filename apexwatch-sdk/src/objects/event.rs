//! Event envelope submitted by producers.

use serde::{Deserialize, Serialize};

/// Raw event as submitted to `POST /api/webhook/event` and stored in the queue.
///
/// The payload is left untyped on the wire; the core service parses it into a
/// typed event when the message is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl EventEnvelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// The `token_id` carried in the payload, if it is a non-empty string.
    pub fn token_id(&self) -> Option<&str> {
        self.data
            .get("token_id")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Kinds of events the pipeline knows how to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PriceChange,
    VolumeSpike,
    WalletTransfer,
    NewsUpdate,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PriceChange => "price_change",
            EventKind::VolumeSpike => "volume_spike",
            EventKind::WalletTransfer => "wallet_transfer",
            EventKind::NewsUpdate => "news_update",
            EventKind::Unknown => "unknown",
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            "price_change" => EventKind::PriceChange,
            "volume_spike" => EventKind::VolumeSpike,
            "wallet_transfer" => EventKind::WalletTransfer,
            "news_update" => EventKind::NewsUpdate,
            _ => EventKind::Unknown,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_parsing() {
        let json = r#"{"kind":"wallet_transfer","data":{"token_id":"t1","amount":5000}}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.kind, "wallet_transfer");
        assert_eq!(envelope.token_id(), Some("t1"));
        assert_eq!(EventKind::from(envelope.kind.as_str()), EventKind::WalletTransfer);
    }

    #[test]
    fn test_missing_or_blank_token_id() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"kind":"price_change","data":{}}"#).unwrap();
        assert_eq!(envelope.token_id(), None);

        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"kind":"price_change","data":{"token_id":"  "}}"#).unwrap();
        assert_eq!(envelope.token_id(), None);

        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"kind":"price_change","data":{"token_id":7}}"#).unwrap();
        assert_eq!(envelope.token_id(), None);
    }

    #[test]
    fn test_unrecognized_kind() {
        assert_eq!(EventKind::from("whale_alert"), EventKind::Unknown);
        let kind: EventKind = serde_json::from_str(r#""whale_alert""#).unwrap();
        assert_eq!(kind, EventKind::Unknown);
        assert_eq!(serde_json::to_string(&EventKind::NewsUpdate).unwrap(), r#""news_update""#);
    }
}
