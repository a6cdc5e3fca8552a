//! API Key infrastructure implementations
//!
//! This module provides key generation, the RSA signing keypair, token
//! signing, the credential stores and the key manager service.

mod generator;
mod keypair;
mod repository;
mod service;
mod sqlite_repository;
mod token;

pub use generator::ApiKeyGenerator;
pub use keypair::{SigningKeypair, MIN_KEY_BITS};
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, IssuedApiKey};
pub use sqlite_repository::SqliteApiKeyRepository;
pub use token::TokenSigner;
