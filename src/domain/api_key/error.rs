//! Credential validation and lifecycle errors

use thiserror::Error;

use super::validation::ApiKeyValidationError;
use crate::domain::DomainError;

/// Errors produced by the key manager
///
/// Everything except `Signing` and `Storage` is a rejected credential and maps to
/// an authentication failure at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error("API key is missing")]
    Missing,

    #[error("API key is malformed: {0}")]
    Malformed(String),

    #[error("API key signature is invalid")]
    InvalidSignature,

    #[error("API key claims are invalid: {0}")]
    InvalidClaims(#[from] ApiKeyValidationError),

    #[error("API key has expired")]
    Expired,

    #[error("API key not found")]
    NotFound,

    #[error("Failed to sign API key: {0}")]
    Signing(String),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl ApiKeyError {
    /// Whether this error means the presented credential was rejected
    /// (as opposed to the manager failing to do its job)
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Storage(_))
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidClaims(_) => "invalid_claims",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
            Self::Signing(_) => "signing",
            Self::Storage(_) => "storage",
        }
    }
}
