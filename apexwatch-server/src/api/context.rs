use apexwatch_core::entities::context::{GetTokenContext, TokenContextRow};
use apexwatch_core::framework::DatabaseProcessor;
use apexwatch_sdk::objects::{ContextResponse, ContextSnapshot, EventKind};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;

use crate::api::extractors::AccessKey;
use crate::state::AppState;

use super::{ApiError, now_timestamp};

/// `GET /context/{token_id}`: the token's accumulated context, or `null`
/// if it has none (or it expired).
pub async fn get_context(
    State(state): State<AppState>,
    _auth: AccessKey,
    Path(token_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let row = processor
        .process(GetTokenContext {
            token_id: token_id.clone(),
        })
        .await
        .map_err(ApiError::Database)?;

    Ok(Json(ContextResponse {
        token_id,
        context: row.map(to_snapshot),
        timestamp: now_timestamp(),
    }))
}

fn to_snapshot(row: TokenContextRow) -> ContextSnapshot {
    ContextSnapshot {
        summary: row.summary,
        last_updated: row.last_updated.map(|t| t.unix_timestamp()),
        event_count: row.event_count,
        last_event_kind: row.last_event_kind.as_deref().map(EventKind::from),
    }
}
