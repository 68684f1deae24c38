use apexwatch_core::entities::AnalysisResult;
use apexwatch_core::entities::thought::ListThoughts;
use apexwatch_core::framework::DatabaseProcessor;
use apexwatch_sdk::objects::{ListThoughtsQuery, ThoughtResponse, ThoughtsPage, clamp_pagination};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;

use crate::api::extractors::AccessKey;
use crate::state::AppState;

use super::ApiError;

/// `GET /thoughts/{token_id}`: stored analyses for a token, newest first.
pub async fn list_thoughts(
    State(state): State<AppState>,
    _auth: AccessKey,
    Path(token_id): Path<String>,
    Query(query): Query<ListThoughtsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let results = processor
        .process(ListThoughts {
            token_id: token_id.clone(),
            limit,
            offset,
        })
        .await
        .map_err(ApiError::Database)?;

    let thoughts: Vec<_> = results.into_iter().map(to_response).collect();
    Ok(Json(ThoughtsPage {
        token_id,
        count: thoughts.len(),
        thoughts,
        limit,
        offset,
    }))
}

fn to_response(result: AnalysisResult) -> ThoughtResponse {
    ThoughtResponse {
        id: result.id.to_string(),
        token_id: result.token_id,
        event_kind: result.event_kind,
        analysis_text: result.analysis_text,
        provider_used: result.provider_used,
        tokens_used: result.tokens_used,
        latency_ms: result.latency_ms,
        created_at: result.created_at.unix_timestamp(),
    }
}
