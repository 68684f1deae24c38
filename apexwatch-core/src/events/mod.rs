//! Events flowing through the pipeline.
//!
//! Producers submit an untyped [`EventEnvelope`]; it is queued as-is and only
//! parsed into an [`Event`] when the processor picks it up, so a malformed
//! envelope is dropped at consumption time rather than rejected at ingestion.

pub mod lenient;
pub mod payload;

pub use apexwatch_sdk::objects::{EventEnvelope, EventKind};
pub use payload::{NewsUpdate, PriceChange, VolumeSpike, WalletTransfer};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an envelope could not become an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("event payload has no token_id")]
    MissingTokenId,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    PriceChange(PriceChange),
    VolumeSpike(VolumeSpike),
    WalletTransfer(WalletTransfer),
    NewsUpdate(NewsUpdate),
    /// A kind this version does not understand. The raw payload is kept so
    /// it can still be shown to the reasoning provider.
    Unknown {
        kind: String,
        data: Map<String, Value>,
    },
}

/// A parsed event about a single token.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub token_id: String,
    pub payload: EventPayload,
}

impl Event {
    /// Parse an envelope. Only a missing `token_id` is an error; payload
    /// fields that are absent or mistyped are left empty.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, MalformedEvent> {
        let token_id = envelope
            .token_id()
            .ok_or(MalformedEvent::MissingTokenId)?
            .to_string();

        let payload = match EventKind::from(envelope.kind.as_str()) {
            EventKind::PriceChange => EventPayload::PriceChange(typed(&envelope.data)),
            EventKind::VolumeSpike => EventPayload::VolumeSpike(typed(&envelope.data)),
            EventKind::WalletTransfer => EventPayload::WalletTransfer(typed(&envelope.data)),
            EventKind::NewsUpdate => EventPayload::NewsUpdate(typed(&envelope.data)),
            EventKind::Unknown => EventPayload::Unknown {
                kind: envelope.kind.clone(),
                data: envelope.data.clone(),
            },
        };

        Ok(Self { token_id, payload })
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::PriceChange(_) => EventKind::PriceChange,
            EventPayload::VolumeSpike(_) => EventKind::VolumeSpike,
            EventPayload::WalletTransfer(_) => EventKind::WalletTransfer,
            EventPayload::NewsUpdate(_) => EventKind::NewsUpdate,
            EventPayload::Unknown { .. } => EventKind::Unknown,
        }
    }
}

fn typed<T: DeserializeOwned + Default>(data: &Map<String, Value>) -> T {
    serde_json::from_value(Value::Object(data.clone())).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> EventEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_wallet_transfer_parsing() {
        let event = Event::from_envelope(&envelope(json!({
            "kind": "wallet_transfer",
            "data": {
                "token_id": "t1",
                "from_address": "0xA",
                "to_address": "0xB",
                "amount": 5000,
                "tx_hash": "0xdead"
            }
        })))
        .unwrap();

        assert_eq!(event.token_id, "t1");
        assert_eq!(event.kind(), EventKind::WalletTransfer);
        let EventPayload::WalletTransfer(transfer) = event.payload else {
            panic!("expected wallet transfer payload");
        };
        assert_eq!(transfer.from_address.as_deref(), Some("0xA"));
        assert_eq!(transfer.amount.map(|a| a.to_string()).as_deref(), Some("5000"));
        assert_eq!(transfer.timestamp, None);
    }

    #[test]
    fn test_missing_token_id() {
        let err = Event::from_envelope(&envelope(json!({"kind": "price_change", "data": {}})))
            .unwrap_err();
        assert_eq!(err, MalformedEvent::MissingTokenId);
    }

    #[test]
    fn test_mistyped_fields_do_not_fail() {
        let event = Event::from_envelope(&envelope(json!({
            "kind": "price_change",
            "data": {"token_id": "t1", "new_price": {"nested": true}, "exchange": null}
        })))
        .unwrap();

        assert_eq!(event.payload, EventPayload::PriceChange(PriceChange::default()));
    }

    #[test]
    fn test_unknown_kind_keeps_raw_payload() {
        let event = Event::from_envelope(&envelope(json!({
            "kind": "whale_alert",
            "data": {"token_id": "t1", "size": "huge"}
        })))
        .unwrap();

        assert_eq!(event.kind(), EventKind::Unknown);
        match event.payload {
            EventPayload::Unknown { kind, data } => {
                assert_eq!(kind, "whale_alert");
                assert_eq!(data.get("size"), Some(&json!("huge")));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
