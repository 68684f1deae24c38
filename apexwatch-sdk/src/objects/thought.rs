//! Analysis history ("thoughts") responses and query parameters.

use serde::{Deserialize, Serialize};

/// One persisted analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtResponse {
    pub id: String,
    pub token_id: String,
    pub event_kind: String,
    pub analysis_text: String,
    pub provider_used: String,
    pub tokens_used: i64,
    pub latency_ms: i64,
    pub created_at: i64,
}

/// Response of `GET /api/thoughts/{token_id}`, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtsPage {
    pub token_id: String,
    pub thoughts: Vec<ThoughtResponse>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing thoughts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListThoughtsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for ListThoughtsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}
