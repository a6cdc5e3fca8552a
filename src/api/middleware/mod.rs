//! API middleware components

pub mod admin_auth;
pub mod auth;
pub mod logging;
pub mod metrics;
pub mod security;

pub use admin_auth::{RequireAdmin, ADMIN_TOKEN_HEADER};
pub use auth::{RequireApiKey, API_KEY_HEADER};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::security_headers_middleware;
