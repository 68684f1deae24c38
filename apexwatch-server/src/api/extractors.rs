//! Custom Axum extractors for request authentication.
//!
//! Every `/api` route takes an [`AccessKey`], which checks the
//! `X-Access-Key` header against the configured shared key.

use apexwatch_sdk::ACCESS_KEY_HEADER;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Proof that the request carried the shared access key.
pub struct AccessKey;

/// Errors returned by the [`AccessKey`] extractor.
#[derive(Debug)]
pub enum AccessKeyError {
    Missing,
    Invalid,
}

impl IntoResponse for AccessKeyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AccessKeyError::Missing => (StatusCode::UNAUTHORIZED, "missing X-Access-Key header"),
            AccessKeyError::Invalid => (StatusCode::FORBIDDEN, "invalid access key"),
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AccessKey {
    type Rejection = AccessKeyError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ACCESS_KEY_HEADER)
            .ok_or(AccessKeyError::Missing)?
            .to_str()
            .map_err(|_| AccessKeyError::Invalid)?;

        if state.config.server.read().await.verify_access_key(presented) {
            Ok(AccessKey)
        } else {
            tracing::warn!("Rejected request with an invalid access key");
            Err(AccessKeyError::Invalid)
        }
    }
}
