//! Token context as exposed to the dashboard.

use serde::{Deserialize, Serialize};

use super::event::EventKind;

/// Rolling per-token memory. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub summary: String,
    pub last_updated: Option<i64>,
    pub event_count: i64,
    pub last_event_kind: Option<EventKind>,
}

/// Response of `GET /api/context/{token_id}`.
///
/// `context` is `None` when the token has no live context (never seen, or
/// expired).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextResponse {
    pub token_id: String,
    pub context: Option<ContextSnapshot>,
    pub timestamp: i64,
}
