use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::docs;
use super::health;
use super::keys;
use super::messages;
use super::middleware::{logging_middleware, metrics_middleware, security_headers_middleware};
use super::state::AppState;

/// Room for multipart framing and text fields on top of the file itself
const BODY_HEADROOM: usize = 1024 * 1024;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    let body_limit = state.limits.max_file_bytes.saturating_add(BODY_HEADROOM);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Documentation
        .route("/", get(docs::index))
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Dispatch and key exchange
        .route("/send-message", post(messages::send_message))
        .route("/keygen", post(keys::register_key))
        .route("/keys/public", get(keys::public_key))
        // Operator API
        .nest("/admin", admin::create_admin_router())
        .fallback(docs::redirect_home)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
