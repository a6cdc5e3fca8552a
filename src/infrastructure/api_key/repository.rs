//! In-memory credential store implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyRepository, ApiKeyValue};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Inner {
    keys: HashMap<String, ApiKey>,
    next_id: i64,
}

/// In-memory implementation of ApiKeyRepository
///
/// Used for tests and for deployments configured with `database_url = "memory"`;
/// contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryApiKeyRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryApiKeyRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_by_key(&self, key: &ApiKeyValue) -> Result<Option<ApiKey>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner.keys.get(key.as_str()).cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut inner = self.inner.write().await;
        let key = api_key.key().as_str().to_string();

        if inner.keys.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "API key '{}' already exists",
                api_key.key().prefix()
            )));
        }

        inner.next_id += 1;
        let api_key = api_key.with_id(inner.next_id);
        inner.keys.insert(key, api_key.clone());

        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut inner = self.inner.write().await;
        let key = api_key.key().as_str();

        match inner.keys.get_mut(key) {
            Some(stored) => {
                *stored = api_key.clone();
                Ok(api_key.clone())
            }
            None => Err(DomainError::not_found(format!(
                "API key '{}' not found",
                api_key.key().prefix()
            ))),
        }
    }

    async fn delete_by_key(&self, key: &ApiKeyValue) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;
        Ok(inner.keys.remove(key.as_str()).is_some())
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let inner = self.inner.read().await;
        let mut keys: Vec<ApiKey> = inner.keys.values().cloned().collect();
        keys.sort_by_key(|k| k.id());
        Ok(keys)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.inner.read().await.keys.len())
    }
}
