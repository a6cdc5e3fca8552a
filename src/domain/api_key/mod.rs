//! API Key domain
//!
//! This module provides domain types and traits for the credential lifecycle:
//! the stored record, the signed claim set, and the credential store contract.

mod entity;
mod error;
mod repository;
mod validation;

pub use entity::{ApiKey, ApiKeyClaims, ApiKeyValue};
pub use error::ApiKeyError;
pub use repository::ApiKeyRepository;
pub use validation::{
    validate_details, validate_key_value, ApiKeyValidationError, MAX_DETAILS_LENGTH,
    MAX_KEY_VALUE_LENGTH,
};

#[cfg(test)]
pub use repository::mock::MockApiKeyRepository;
