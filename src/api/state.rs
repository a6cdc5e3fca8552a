//! Application state for shared services

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::api_key::{ApiKey, ApiKeyError, ApiKeyRepository, ApiKeyValue};
use crate::domain::dispatch::DispatchLimits;
use crate::infrastructure::api_key::{ApiKeyService, IssuedApiKey};
use crate::infrastructure::dispatch::DispatchEngine;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub api_key_service: Arc<dyn ApiKeyServiceTrait>,
    pub dispatch_engine: Arc<DispatchEngine>,
    pub limits: DispatchLimits,
    /// Deadline for one dispatch batch; the batch is cancelled when it passes
    pub request_timeout: Duration,
    pub admin_token: Option<Arc<str>>,
    pub docs_path: PathBuf,
}

/// Trait for API key service operations
#[async_trait::async_trait]
pub trait ApiKeyServiceTrait: Send + Sync {
    fn public_key_pem(&self) -> &str;
    async fn issue(
        &self,
        details: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedApiKey, ApiKeyError>;
    async fn validate(&self, token: &str) -> Result<ApiKey, ApiKeyError>;
    async fn validate_and_register(&self, token: &str) -> Result<ApiKey, ApiKeyError>;
    async fn edit(&self, token: &str, new_expiry: DateTime<Utc>) -> Result<ApiKey, ApiKeyError>;
    async fn revoke(&self, key: &ApiKeyValue) -> Result<(), ApiKeyError>;
    async fn list(&self) -> Result<Vec<ApiKey>, ApiKeyError>;
    async fn count(&self) -> Result<usize, ApiKeyError>;
}

#[async_trait::async_trait]
impl<R: ApiKeyRepository + 'static> ApiKeyServiceTrait for ApiKeyService<R> {
    fn public_key_pem(&self) -> &str {
        ApiKeyService::public_key_pem(self)
    }

    async fn issue(
        &self,
        details: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedApiKey, ApiKeyError> {
        ApiKeyService::issue(self, details, expires_at).await
    }

    async fn validate(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        ApiKeyService::validate(self, token).await
    }

    async fn validate_and_register(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        ApiKeyService::validate_and_register(self, token).await
    }

    async fn edit(&self, token: &str, new_expiry: DateTime<Utc>) -> Result<ApiKey, ApiKeyError> {
        ApiKeyService::edit(self, token, new_expiry).await
    }

    async fn revoke(&self, key: &ApiKeyValue) -> Result<(), ApiKeyError> {
        ApiKeyService::revoke(self, key).await
    }

    async fn list(&self) -> Result<Vec<ApiKey>, ApiKeyError> {
        ApiKeyService::list(self).await
    }

    async fn count(&self) -> Result<usize, ApiKeyError> {
        ApiKeyService::count(self).await
    }
}

impl AppState {
    pub fn new(
        api_key_service: Arc<dyn ApiKeyServiceTrait>,
        dispatch_engine: Arc<DispatchEngine>,
    ) -> Self {
        Self {
            api_key_service,
            dispatch_engine,
            limits: DispatchLimits::default(),
            request_timeout: Duration::from_secs(300),
            admin_token: None,
            docs_path: PathBuf::from("doc.md"),
        }
    }

    pub fn with_limits(mut self, limits: DispatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the admin token; blank tokens leave the admin routes disabled
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Arc::from);
        self
    }

    pub fn with_docs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.docs_path = path.into();
        self
    }
}
