//! API key management admin endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::api_key::{ApiKey, ApiKeyError, ApiKeyValue};

/// Expiry given either as an absolute time or as hours from now
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiryRequest {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ttl_hours: Option<i64>,
}

impl ExpiryRequest {
    /// Resolve to an absolute expiry; exactly one of the two fields must be set
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
        match (self.expires_at, self.ttl_hours) {
            (Some(at), None) => Ok(at),
            (None, Some(hours)) => Duration::try_hours(hours)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| ApiError::bad_request("ttl_hours is out of range")),
            (Some(_), Some(_)) => Err(ApiError::bad_request(
                "Provide either expires_at or ttl_hours, not both",
            )),
            (None, None) => Err(ApiError::bad_request("expires_at or ttl_hours is required")),
        }
    }
}

/// Request to issue a new API key
#[derive(Debug, Clone, Deserialize)]
pub struct IssueApiKeyRequest {
    pub details: String,
    #[serde(flatten)]
    pub expiry: ExpiryRequest,
}

/// Request to move an API key's expiry
#[derive(Debug, Clone, Deserialize)]
pub struct EditApiKeyRequest {
    pub token: String,
    #[serde(flatten)]
    pub expiry: ExpiryRequest,
}

/// API key response for admin API
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: Option<i64>,
    pub key: String,
    pub deadline: String,
    pub details: String,
    pub expired: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id(),
            key: key.key().to_string(),
            deadline: key.deadline().to_rfc3339(),
            details: key.details().to_string(),
            expired: key.is_expired(),
            created_at: key.created_at().to_rfc3339(),
            updated_at: key.updated_at().to_rfc3339(),
        }
    }
}

/// List API keys response
#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

/// Issued key response; the token is only ever returned here
#[derive(Debug, Clone, Serialize)]
pub struct IssuedApiKeyResponse {
    pub token: String,
    pub key: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedApiKeyResponse {
    pub token: String,
    pub expires_at: String,
}

/// Key errors on the admin surface describe the operator's input, not a failed login
fn admin_error(err: ApiKeyError) -> ApiError {
    match err {
        ApiKeyError::NotFound => ApiError::not_found(err.to_string()),
        e if e.is_rejection() => ApiError::bad_request(e.to_string()),
        e => ApiError::from(e),
    }
}

/// GET /admin/keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    debug!("Admin listing all API keys");

    let keys = state.api_key_service.list().await.map_err(admin_error)?;

    let api_keys: Vec<ApiKeyResponse> = keys.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// POST /admin/keys
pub async fn issue_api_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<IssueApiKeyRequest>,
) -> Result<(StatusCode, Json<IssuedApiKeyResponse>), ApiError> {
    let expires_at = request.expiry.resolve(Utc::now())?;

    let issued = state
        .api_key_service
        .issue(&request.details, expires_at)
        .await
        .map_err(admin_error)?;

    info!(key = %issued.api_key.key().prefix(), "Admin issued API key");

    Ok((
        StatusCode::CREATED,
        Json(IssuedApiKeyResponse {
            token: issued.token,
            key: issued.api_key.key().to_string(),
            expires_at: issued.api_key.deadline().to_rfc3339(),
        }),
    ))
}

/// PUT /admin/keys
pub async fn edit_api_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<EditApiKeyRequest>,
) -> Result<Json<EditedApiKeyResponse>, ApiError> {
    let new_expiry = request.expiry.resolve(Utc::now())?;

    let edited = state
        .api_key_service
        .edit(&request.token, new_expiry)
        .await
        .map_err(admin_error)?;

    let token = edited
        .signed()
        .map(str::to_string)
        .ok_or_else(|| ApiError::internal("Edited key was returned without a token"))?;

    Ok(Json(EditedApiKeyResponse {
        token,
        expires_at: edited.deadline().to_rfc3339(),
    }))
}

/// DELETE /admin/keys/{key}
pub async fn revoke_api_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key = ApiKeyValue::new(key).map_err(|e| ApiError::bad_request(e.to_string()))?;

    debug!(key = %key.prefix(), "Admin revoking API key");

    state
        .api_key_service
        .revoke(&key)
        .await
        .map_err(admin_error)?;

    Ok(StatusCode::NO_CONTENT)
}
