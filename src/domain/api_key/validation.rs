//! API key validation utilities

use thiserror::Error;

/// Errors that can occur during API key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key value cannot be empty")]
    EmptyKey,

    #[error("API key value exceeds maximum length of {0} characters")]
    KeyTooLong(usize),

    #[error("API key value contains invalid character: '{0}'. Only alphanumeric characters, '-' and '_' are allowed")]
    InvalidCharacter(char),

    #[error("API key details exceed maximum length of {0} characters")]
    DetailsTooLong(usize),
}

pub const MAX_KEY_VALUE_LENGTH: usize = 128;
pub const MAX_DETAILS_LENGTH: usize = 1024;

/// Validate an API key value
///
/// Rules:
/// - Cannot be empty
/// - Maximum 128 characters
/// - Only ASCII alphanumeric characters, hyphens and underscores
///
/// Generated keys are 64 lowercase hex characters; the wider alphabet admits
/// keys minted out-of-band and registered through the key exchange.
pub fn validate_key_value(key: &str) -> Result<(), ApiKeyValidationError> {
    if key.is_empty() {
        return Err(ApiKeyValidationError::EmptyKey);
    }

    if key.len() > MAX_KEY_VALUE_LENGTH {
        return Err(ApiKeyValidationError::KeyTooLong(MAX_KEY_VALUE_LENGTH));
    }

    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ApiKeyValidationError::InvalidCharacter(c));
    }

    Ok(())
}

pub fn validate_details(details: &str) -> Result<(), ApiKeyValidationError> {
    if details.chars().count() > MAX_DETAILS_LENGTH {
        return Err(ApiKeyValidationError::DetailsTooLong(MAX_DETAILS_LENGTH));
    }

    Ok(())
}
