//! Queue ingestion and status responses.

use serde::{Deserialize, Serialize};

/// Returned with `202 Accepted` once an event has been durably queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedResponse {
    pub status: String,
    pub kind: String,
    pub timestamp: i64,
}

/// Current number of undelivered events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatusResponse {
    pub queue_size: u64,
    pub timestamp: i64,
}
