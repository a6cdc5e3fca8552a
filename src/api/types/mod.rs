//! Wire types shared by the HTTP handlers

pub mod error;
pub mod json;
pub mod response;

pub use error::{ApiError, ApiErrorResponse, ErrorStage};
pub use json::Json;
pub use response::MessageResponse;
