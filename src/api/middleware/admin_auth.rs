//! Admin authentication middleware
//!
//! The `/admin` routes are guarded by a shared operator token sent in
//! `X-Admin-Token`. When no token is configured the routes are closed.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Header carrying the operator token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extractor that requires the configured admin token
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            warn!("Admin route requested but no admin token is configured");
            return Err(ApiError::forbidden("Admin API is disabled"));
        };

        let presented = presented_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Admin token required"))?;

        if !constant_time_compare(presented, expected) {
            return Err(ApiError::forbidden("Invalid admin token"));
        }

        debug!("Admin access granted");
        Ok(RequireAdmin)
    }
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Constant-time comparison over digests so the token length does not leak either
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());

    let mut result = 0u8;

    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
