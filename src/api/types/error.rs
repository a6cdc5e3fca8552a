//! Error envelope returned by every endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::api_key::ApiKeyError;
use crate::domain::dispatch::{DispatchOutcome, DispatchValidationError};
use crate::domain::DomainError;

/// Where in request handling the failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    /// Request rejected before anything was attempted
    Validation,
    /// Transport session missing or disconnected; nothing was sent
    Precondition,
    /// Some or all recipients failed while the batch ran
    Delivery,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    Internal,
    Unavailable,
}

impl std::fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Precondition => "precondition",
            Self::Delivery => "delivery",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// `{"Reasons": [...], "stage": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(rename = "Reasons")]
    pub reasons: Vec<String>,
    pub stage: ErrorStage,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    /// Create a new API error with a list of reasons
    pub fn new(status: StatusCode, stage: ErrorStage, reasons: Vec<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse { reasons, stage },
        }
    }

    fn single(status: StatusCode, stage: ErrorStage, message: impl Into<String>) -> Self {
        Self::new(status, stage, vec![message.into()])
    }

    /// Validation error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::single(StatusCode::BAD_REQUEST, ErrorStage::Validation, message)
    }

    /// Authentication error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::single(StatusCode::UNAUTHORIZED, ErrorStage::Authentication, message)
    }

    /// Permission error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::single(StatusCode::FORBIDDEN, ErrorStage::Authorization, message)
    }

    /// Not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::single(StatusCode::NOT_FOUND, ErrorStage::NotFound, message)
    }

    /// Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::single(StatusCode::CONFLICT, ErrorStage::Conflict, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::single(StatusCode::INTERNAL_SERVER_ERROR, ErrorStage::Internal, message)
    }

    /// Service unavailable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::single(StatusCode::SERVICE_UNAVAILABLE, ErrorStage::Unavailable, message)
    }

    /// Map a finished dispatch to an error, or `None` when every recipient was delivered
    pub fn from_outcome(outcome: &DispatchOutcome) -> Option<Self> {
        if outcome.is_success() {
            return None;
        }

        let stage = if outcome.is_precondition_failure() {
            ErrorStage::Precondition
        } else {
            ErrorStage::Delivery
        };

        Some(Self::new(StatusCode::BAD_REQUEST, stage, outcome.reasons()))
    }

    pub fn stage(&self) -> ErrorStage {
        self.response.stage
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::Conflict { message } => Self::conflict(message),
            DomainError::Transport { .. } => Self::unavailable(err.to_string()),
            DomainError::Configuration { message } => Self::internal(message),
            DomainError::Storage { .. } => Self::internal(err.to_string()),
            DomainError::Internal { message } => Self::internal(message),
        }
    }
}

impl From<ApiKeyError> for ApiError {
    fn from(err: ApiKeyError) -> Self {
        if err.is_rejection() {
            Self::unauthorized(err.to_string())
        } else {
            tracing::error!(error = %err, "API key operation failed");
            Self::internal(err.to_string())
        }
    }
}

impl From<DispatchValidationError> for ApiError {
    fn from(err: DispatchValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.stage,
            self.response.reasons.join("; ")
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::RecipientFailure;

    #[test]
    fn test_envelope_shape() {
        let err = ApiError::unauthorized("API key expired");
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["Reasons"][0], "API key expired");
        assert_eq!(json["stage"], "authentication");
    }

    #[test]
    fn test_all_error_statuses() {
        assert_eq!(ApiError::bad_request("").status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("").status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("").status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("").status, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::internal("").status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::unavailable("").status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_domain_error_conversion() {
        let api_err: ApiError = DomainError::not_found("missing").into();
        assert_eq!(api_err.status, StatusCode::NOT_FOUND);

        let api_err: ApiError = DomainError::storage("disk full").into();
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_key_error_conversion() {
        let api_err: ApiError = ApiKeyError::Expired.into();
        assert_eq!(api_err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api_err.stage(), ErrorStage::Authentication);

        let api_err: ApiError = ApiKeyError::NotFound.into();
        assert_eq!(api_err.status, StatusCode::UNAUTHORIZED);

        let api_err: ApiError = ApiKeyError::Signing("bad key".to_string()).into();
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_conversion() {
        let api_err: ApiError = DispatchValidationError::MessageTooLong {
            length: 251,
            max: 250,
        }
        .into();

        assert_eq!(api_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_err.stage(), ErrorStage::Validation);
        assert_eq!(
            api_err.response.reasons,
            vec!["Message exceeds the maximum length of 250 characters"]
        );
    }

    #[test]
    fn test_from_outcome() {
        assert!(ApiError::from_outcome(&DispatchOutcome::from_results(vec![], 2, 2, false)).is_none());

        let err = ApiError::from_outcome(&DispatchOutcome::not_connected()).unwrap();
        assert_eq!(err.stage(), ErrorStage::Precondition);
        assert_eq!(err.response.reasons, vec!["transport session not connected"]);

        let outcome = DispatchOutcome::from_results(
            vec![RecipientFailure {
                index: 1,
                recipient: "4912".to_string(),
                error: "boom".to_string(),
            }],
            3,
            2,
            false,
        );
        let err = ApiError::from_outcome(&outcome).unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.stage(), ErrorStage::Delivery);
        assert_eq!(err.response.reasons, vec!["boom-1: (4912)"]);
    }
}
