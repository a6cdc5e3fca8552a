//! API key authentication middleware

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKey, ApiKeyError};

/// Header carrying the signed API key token
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that requires a valid API key
///
/// Reads the signed token from the `X-API-Key` header and runs it through
/// validation only; tokens are never registered here. A rejected token is a
/// 401 carrying the reason; a credential store fault is a 500.
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub ApiKey);

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_api_key_from_headers(&parts.headers)?;

        debug!(
            token_prefix = %token.chars().take(8).collect::<String>(),
            "Validating API key"
        );

        match state.api_key_service.validate(&token).await {
            Ok(api_key) => Ok(RequireApiKey(api_key)),
            Err(e) if e.is_rejection() => {
                debug!(reason = e.label(), "API key rejected");
                Err(ApiError::unauthorized(e.to_string()))
            }
            // Store faults are not the caller's fault: 500, same as /keygen
            Err(e) => Err(ApiError::from(e)),
        }
    }
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(value) = headers.get(API_KEY_HEADER) else {
        return Err(ApiError::unauthorized(ApiKeyError::Missing.to_string()));
    };

    let token = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid X-API-Key header encoding"))?
        .trim();

    if token.is_empty() {
        return Err(ApiError::unauthorized(ApiKeyError::Missing.to_string()));
    }

    Ok(token.to_string())
}
