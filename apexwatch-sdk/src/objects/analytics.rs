//! Token analytics rows written by the pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticResponse {
    pub metric_name: String,
    /// Decimal value rendered as a string to avoid float rounding.
    pub metric_value: String,
    pub created_at: i64,
}

/// Response of `GET /api/analytics/{token_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPage {
    pub token_id: String,
    pub analytics: Vec<AnalyticResponse>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub metric_name: Option<String>,
}
