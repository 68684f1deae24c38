//! HTTP API handlers.
//!
//! All routes require the `X-Access-Key` header.
//!
//! # Endpoints
//!
//! - `POST /webhook/event`        : queue an event from a producer
//! - `GET  /queue/status`         : number of events waiting
//! - `GET  /context/{token_id}`   : current context of a token
//! - `GET  /thoughts/{token_id}`  : stored analyses, newest first
//! - `GET  /analytics/{token_id}` : recent numeric data points

use apexwatch_core::queue::{PublishError, QueueError};
use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use time::OffsetDateTime;

use crate::state::AppState;

pub mod extractors;

mod analytics;
mod context;
mod events;
mod queue;
mod thoughts;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/event", post(events::ingest_event))
        .route("/queue/status", get(queue::queue_status))
        .route("/context/{token_id}", get(context::get_context))
        .route("/thoughts/{token_id}", get(thoughts::list_thoughts))
        .route("/analytics/{token_id}", get(analytics::list_analytics))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    Database(sqlx::Error),
    Queue(QueueError),
    Publish(PublishError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Database(e) => {
                tracing::error!(error = %e, "API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ApiError::Queue(e) => {
                tracing::error!(error = %e, "API queue error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ApiError::Publish(e) => {
                tracing::error!(error = %e, "Failed to queue event");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to queue event").into_response()
            }
        }
    }
}

/// Unix timestamp (seconds) stamped on responses.
pub(crate) fn now_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
