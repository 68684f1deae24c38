use apexwatch_core::entities::analytics::ListTokenAnalytics;
use apexwatch_core::framework::DatabaseProcessor;
use apexwatch_sdk::objects::{AnalyticResponse, AnalyticsPage, AnalyticsQuery};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;

use crate::api::extractors::AccessKey;
use crate::state::AppState;

use super::ApiError;

const ANALYTICS_LIMIT: i64 = 100;

/// `GET /analytics/{token_id}`: the latest data points for a token,
/// optionally restricted to one metric.
pub async fn list_analytics(
    State(state): State<AppState>,
    _auth: AccessKey,
    Path(token_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let rows = processor
        .process(ListTokenAnalytics {
            token_id: token_id.clone(),
            metric_name: query.metric_name.filter(|name| !name.is_empty()),
            limit: ANALYTICS_LIMIT,
        })
        .await
        .map_err(ApiError::Database)?;

    // Values go out as strings so no precision is lost to JSON floats.
    let analytics: Vec<_> = rows
        .into_iter()
        .map(|row| AnalyticResponse {
            metric_name: row.metric_name,
            metric_value: row.metric_value.to_string(),
            created_at: row.created_at.unix_timestamp(),
        })
        .collect();

    Ok(Json(AnalyticsPage {
        token_id,
        count: analytics.len(),
        analytics,
    }))
}
