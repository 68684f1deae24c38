use apexwatch_sdk::objects::{EventEnvelope, QueuedResponse};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::api::extractors::AccessKey;
use crate::state::AppState;

use super::{ApiError, now_timestamp};

/// `POST /webhook/event`: queue an event for analysis.
///
/// The payload is not validated here; events without a `token_id` are
/// dropped by the consumer.
pub async fn ingest_event(
    State(state): State<AppState>,
    _auth: AccessKey,
    Json(envelope): Json<EventEnvelope>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = envelope.kind.clone();
    state.queue.publish(envelope).await.map_err(ApiError::Publish)?;
    tracing::info!(kind = %kind, "Event queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            status: "queued".to_string(),
            kind,
            timestamp: now_timestamp(),
        }),
    ))
}
