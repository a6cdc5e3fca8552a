//! API Key service
//!
//! Issues, validates, edits and revokes signed credentials. Owns the token
//! signer and the credential store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::api_key::{ApiKey, ApiKeyClaims, ApiKeyError, ApiKeyRepository, ApiKeyValue};
use crate::infrastructure::observability::record_api_key_validation;

use super::generator::ApiKeyGenerator;
use super::token::TokenSigner;

/// Result of issuing a new API key
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    /// The stored record
    pub api_key: ApiKey,
    /// The signed bearer token handed to the caller
    pub token: String,
}

/// API Key service for managing signed credentials
#[derive(Debug)]
pub struct ApiKeyService<R>
where
    R: ApiKeyRepository,
{
    repository: Arc<R>,
    signer: TokenSigner,
    generator: ApiKeyGenerator,
}

impl<R: ApiKeyRepository> ApiKeyService<R> {
    /// Create a new API key service
    pub fn new(repository: Arc<R>, signer: TokenSigner) -> Self {
        Self {
            repository,
            signer,
            generator: ApiKeyGenerator::new(),
        }
    }

    /// PEM public key matching the signing key
    pub fn public_key_pem(&self) -> &str {
        self.signer.public_key_pem()
    }

    /// Issue a new credential expiring at `expires_at`
    pub async fn issue(
        &self,
        details: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedApiKey, ApiKeyError> {
        let details = details.into();
        let key = self.generator.generate()?;

        let claims = ApiKeyClaims::new(&key, details.clone(), expires_at);
        let token = self.signer.sign(&claims)?;

        let api_key = ApiKey::new(key, details, expires_at);
        let created = self.repository.create(api_key).await?;

        info!(
            key = %created.key().prefix(),
            expires_at = %expires_at,
            "API key issued"
        );

        Ok(IssuedApiKey {
            api_key: created.with_signed(token.clone()),
            token,
        })
    }

    /// Validate a presented token: signature, embedded expiry, then the stored row.
    ///
    /// Never writes to the store.
    pub async fn validate(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        let result = self.validate_inner(token).await;
        record_validation(&result);
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        let (key, _claims) = self.verify(token)?;

        match self.repository.find_by_key(&key).await? {
            Some(api_key) => {
                debug!(key = %key.prefix(), "API key validated");
                Ok(api_key.with_signed(token))
            }
            None => {
                debug!(key = %key.prefix(), "API key not found");
                Err(ApiKeyError::NotFound)
            }
        }
    }

    /// Validate a token, materializing its stored record from the claims when
    /// it has none yet.
    ///
    /// Any token carrying a valid signature from this keypair can register
    /// itself; possession of the signing key is the only gate.
    pub async fn validate_and_register(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        let result = self.validate_and_register_inner(token).await;
        record_validation(&result);
        result
    }

    async fn validate_and_register_inner(&self, token: &str) -> Result<ApiKey, ApiKeyError> {
        let (key, claims) = self.verify(token)?;

        if let Some(existing) = self.repository.find_by_key(&key).await? {
            debug!(key = %key.prefix(), "API key already registered");
            return Ok(existing.with_signed(token));
        }

        let api_key = ApiKey::from_claims(key.clone(), &claims);

        match self.repository.create(api_key).await {
            Ok(created) => {
                info!(key = %key.prefix(), "API key registered from token");
                Ok(created.with_signed(token))
            }
            // A concurrent registration of the same token won the insert
            Err(e) if e.is_conflict() => self
                .repository
                .find_by_key(&key)
                .await?
                .map(|existing| existing.with_signed(token))
                .ok_or(ApiKeyError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Move a credential's expiry and return it with a freshly signed token.
    ///
    /// The presented token is only parsed, not verified, so an expired token
    /// can still be extended as long as its key is stored.
    pub async fn edit(
        &self,
        token: &str,
        new_expiry: DateTime<Utc>,
    ) -> Result<ApiKey, ApiKeyError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiKeyError::Missing);
        }

        let claims = self.signer.parse_unverified(token)?;
        let key = claims.validate()?;

        let mut api_key = self
            .repository
            .find_by_key(&key)
            .await?
            .ok_or(ApiKeyError::NotFound)?;

        let claims = ApiKeyClaims::new(&key, api_key.details(), new_expiry);
        let signed = self.signer.sign(&claims)?;

        api_key.extend(new_expiry, signed.clone());
        let updated = self.repository.update(&api_key).await?;

        if new_expiry <= Utc::now() {
            warn!(key = %key.prefix(), "API key edited with an expiry in the past");
        }
        info!(key = %key.prefix(), expires_at = %new_expiry, "API key edited");

        Ok(updated.with_signed(signed))
    }

    /// Delete a credential; tokens for it stop validating immediately
    pub async fn revoke(&self, key: &ApiKeyValue) -> Result<(), ApiKeyError> {
        if !self.repository.delete_by_key(key).await? {
            return Err(ApiKeyError::NotFound);
        }

        info!(key = %key.prefix(), "API key revoked");
        Ok(())
    }

    /// List all stored credentials
    pub async fn list(&self) -> Result<Vec<ApiKey>, ApiKeyError> {
        Ok(self.repository.list().await?)
    }

    /// Count stored credentials
    pub async fn count(&self) -> Result<usize, ApiKeyError> {
        Ok(self.repository.count().await?)
    }

    fn verify(&self, token: &str) -> Result<(ApiKeyValue, ApiKeyClaims), ApiKeyError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiKeyError::Missing);
        }

        let claims = self.signer.verify(token)?;
        let key = claims.validate()?;
        Ok((key, claims))
    }
}

fn record_validation(result: &Result<ApiKey, ApiKeyError>) {
    match result {
        Ok(_) => record_api_key_validation("valid"),
        Err(e) => record_api_key_validation(e.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::MockApiKeyRepository;
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use crate::test_support::{other_keypair, test_keypair};
    use chrono::Duration;

    fn signer() -> TokenSigner {
        TokenSigner::new(&test_keypair()).unwrap()
    }

    fn create_service() -> ApiKeyService<InMemoryApiKeyRepository> {
        ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new()), signer())
    }

    fn in_hours(hours: i64) -> DateTime<Utc> {
        Utc::now() + Duration::hours(hours)
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let service = create_service();
        let issued = service.issue("billing", in_hours(24)).await.unwrap();

        assert_eq!(issued.api_key.key().as_str().len(), 64);
        assert_eq!(issued.api_key.signed(), Some(issued.token.as_str()));

        let validated = service.validate(&issued.token).await.unwrap();
        assert_eq!(validated.key(), issued.api_key.key());
        assert_eq!(validated.details(), "billing");
    }

    #[tokio::test]
    async fn test_validate_missing_token() {
        let service = create_service();
        assert!(matches!(
            service.validate("").await,
            Err(ApiKeyError::Missing)
        ));
        assert!(matches!(
            service.validate("   ").await,
            Err(ApiKeyError::Missing)
        ));
    }

    #[tokio::test]
    async fn test_validate_expired_regardless_of_store() {
        let service = create_service();
        let issued = service.issue("short lived", in_hours(-1)).await.unwrap();

        // The row exists, yet the embedded expiry wins
        assert!(service
            .repository
            .exists(issued.api_key.key())
            .await
            .unwrap());
        assert!(matches!(
            service.validate(&issued.token).await,
            Err(ApiKeyError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_validate_unknown_key() {
        let service = create_service();
        let key = ApiKeyValue::new("feedface").unwrap();
        let token = signer()
            .sign(&ApiKeyClaims::new(&key, "minted elsewhere", in_hours(1)))
            .unwrap();

        assert!(matches!(
            service.validate(&token).await,
            Err(ApiKeyError::NotFound)
        ));
        // Validation must not register the key
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validate_foreign_signature() {
        let service = create_service();
        let foreign = TokenSigner::new(&other_keypair()).unwrap();
        let key = ApiKeyValue::new("feedface").unwrap();
        let token = foreign
            .sign(&ApiKeyClaims::new(&key, "forged", in_hours(1)))
            .unwrap();

        assert!(matches!(
            service.validate(&token).await,
            Err(ApiKeyError::InvalidSignature)
        ));
        assert!(matches!(
            service.validate_and_register(&token).await,
            Err(ApiKeyError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_revoke_then_validate() {
        let service = create_service();
        let issued = service.issue("to revoke", in_hours(24)).await.unwrap();

        service.revoke(issued.api_key.key()).await.unwrap();

        assert!(matches!(
            service.validate(&issued.token).await,
            Err(ApiKeyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_revoke_unknown() {
        let service = create_service();
        let key = ApiKeyValue::new("nothere").unwrap();
        assert!(matches!(
            service.revoke(&key).await,
            Err(ApiKeyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_edit_extends_expired_token() {
        let service = create_service();
        let issued = service.issue("renew me", in_hours(-2)).await.unwrap();
        assert!(matches!(
            service.validate(&issued.token).await,
            Err(ApiKeyError::Expired)
        ));

        let new_expiry = in_hours(48);
        let edited = service.edit(&issued.token, new_expiry).await.unwrap();
        let new_token = edited.signed().unwrap().to_string();
        assert_ne!(new_token, issued.token);

        let validated = service.validate(&new_token).await.unwrap();
        assert_eq!(validated.deadline(), new_expiry);
        assert_eq!(validated.details(), "renew me");

        let claims = signer().verify(&new_token).unwrap();
        assert_eq!(claims.exp, new_expiry.timestamp());

        // The old token keeps its own embedded expiry
        assert!(matches!(
            service.validate(&issued.token).await,
            Err(ApiKeyError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_edit_unknown_key() {
        let service = create_service();
        let key = ApiKeyValue::new("unknown").unwrap();
        let token = signer()
            .sign(&ApiKeyClaims::new(&key, "x", in_hours(1)))
            .unwrap();

        assert!(matches!(
            service.edit(&token, in_hours(2)).await,
            Err(ApiKeyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_edit_malformed_token() {
        let service = create_service();
        assert!(matches!(
            service.edit("garbage", in_hours(2)).await,
            Err(ApiKeyError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_and_register_creates_row() {
        let service = create_service();
        let key = ApiKeyValue::new("c0ffee").unwrap();
        let expires_at = in_hours(12);
        let token = signer()
            .sign(&ApiKeyClaims::new(&key, "onboarding", expires_at))
            .unwrap();

        let registered = service.validate_and_register(&token).await.unwrap();
        assert!(registered.id().is_some());
        assert_eq!(registered.details(), "onboarding");
        assert_eq!(registered.deadline().timestamp(), expires_at.timestamp());

        // Second presentation finds the existing row
        let again = service.validate_and_register(&token).await.unwrap();
        assert_eq!(again.id(), registered.id());
        assert_eq!(service.count().await.unwrap(), 1);

        // And the plain validation path now accepts the token
        assert!(service.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_and_register_rejects_expired() {
        let service = create_service();
        let key = ApiKeyValue::new("c0ffee").unwrap();
        let token = signer()
            .sign(&ApiKeyClaims::new(&key, "late", in_hours(-1)))
            .unwrap();

        assert!(matches!(
            service.validate_and_register(&token).await,
            Err(ApiKeyError::Expired)
        ));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_per_call() {
        let repository = Arc::new(MockApiKeyRepository::new());
        let service = ApiKeyService::new(repository.clone(), signer());
        let issued = service.issue("x", in_hours(1)).await.unwrap();

        repository.set_should_fail(true).await;
        let err = service.validate(&issued.token).await.unwrap_err();
        assert!(matches!(err, ApiKeyError::Storage(_)));
        assert!(!err.is_rejection());

        repository.set_should_fail(false).await;
        assert!(service.validate(&issued.token).await.is_ok());
    }
}
