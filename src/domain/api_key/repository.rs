//! Credential store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyValue};
use crate::domain::DomainError;

/// Repository trait for credential storage
///
/// Implementations must tolerate concurrent callers; concurrent updates to the
/// same row are last-write-wins.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Find a credential by its key value
    async fn find_by_key(&self, key: &ApiKeyValue) -> Result<Option<ApiKey>, DomainError>;

    /// Persist a new credential, assigning its id.
    /// Fails with a conflict error when the key value already exists.
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update deadline, details and timestamp of an existing credential
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// Delete a credential; returns false when no row matched
    async fn delete_by_key(&self, key: &ApiKeyValue) -> Result<bool, DomainError>;

    /// List all credentials, oldest first
    async fn list(&self) -> Result<Vec<ApiKey>, DomainError>;

    /// Count stored credentials
    async fn count(&self) -> Result<usize, DomainError>;

    /// Check if a key value is stored
    async fn exists(&self, key: &ApiKeyValue) -> Result<bool, DomainError> {
        Ok(self.find_by_key(key).await?.is_some())
    }
}
