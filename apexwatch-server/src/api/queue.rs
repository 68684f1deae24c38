use apexwatch_sdk::objects::QueueStatusResponse;
use axum::{Json, extract::State, response::IntoResponse};

use crate::api::extractors::AccessKey;
use crate::state::AppState;

use super::{ApiError, now_timestamp};

/// `GET /queue/status`: number of events waiting for the consumer.
pub async fn queue_status(
    State(state): State<AppState>,
    _auth: AccessKey,
) -> Result<impl IntoResponse, ApiError> {
    let queue_size = state.queue.size().await.map_err(ApiError::Queue)?;
    Ok(Json(QueueStatusResponse {
        queue_size,
        timestamp: now_timestamp(),
    }))
}
