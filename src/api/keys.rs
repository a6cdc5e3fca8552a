//! Key exchange endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::AppState;
use super::types::{ApiError, Json, MessageResponse};

const OCTET_STREAM: &str = "application/octet-stream";

/// Envelope carrying a token minted out of band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchange {
    #[serde(rename = "SignedKey")]
    pub signed_key: String,
}

impl KeyExchange {
    /// Decode a JSON or postcard body depending on the declared content type
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self, ApiError> {
        let is_binary = content_type
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(OCTET_STREAM))
            .unwrap_or(false);

        if is_binary {
            postcard::from_bytes(body)
                .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
        } else {
            serde_json::from_slice(body)
                .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
        }
    }
}

/// POST /keygen
///
/// Registers a presented token: its signature and expiry are checked, and the
/// credential row is created from its claims when the store has none yet.
pub async fn register_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let exchange = KeyExchange::decode(content_type, &body)?;

    let api_key = state
        .api_key_service
        .validate_and_register(&exchange.signed_key)
        .await?;

    info!(key = %api_key.key().prefix(), "Key registered");

    Ok(Json(MessageResponse::new("Key registered")))
}

/// GET /keys/public
pub async fn public_key(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.api_key_service.public_key_pem().to_string(),
    )
}
