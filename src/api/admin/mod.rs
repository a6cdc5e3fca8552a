//! Admin API endpoints for operator key management

pub mod api_keys;

use axum::{
    routing::{delete, get},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/keys",
            get(api_keys::list_api_keys)
                .post(api_keys::issue_api_key)
                .put(api_keys::edit_api_key),
        )
        .route("/keys/{key}", delete(api_keys::revoke_api_key))
}
