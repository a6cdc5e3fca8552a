//! API key value generation
//!
//! Generates the high-entropy identity embedded in every signed token.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::api_key::{ApiKeyError, ApiKeyValue};

/// Generator for random key values
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    /// Number of random bytes to generate
    key_bytes: usize,
}

impl ApiKeyGenerator {
    /// Create a generator producing 32 random bytes (64 hex characters)
    pub fn new() -> Self {
        Self { key_bytes: 32 }
    }

    /// Set the number of random bytes
    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    /// Generate a new key value from the operating system's random source
    pub fn generate(&self) -> Result<ApiKeyValue, ApiKeyError> {
        let mut random_bytes = vec![0u8; self.key_bytes];
        OsRng
            .try_fill_bytes(&mut random_bytes)
            .map_err(|e| ApiKeyError::Signing(format!("random source unavailable: {}", e)))?;

        ApiKeyValue::new(hex::encode(random_bytes)).map_err(ApiKeyError::from)
    }
}

impl Default for ApiKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = ApiKeyGenerator::new().generate().unwrap();
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_uniqueness() {
        let generator = ApiKeyGenerator::new();
        let key1 = generator.generate().unwrap();
        let key2 = generator.generate().unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_custom_width() {
        let key = ApiKeyGenerator::new().with_key_bytes(16).generate().unwrap();
        assert_eq!(key.as_str().len(), 32);
    }
}
