//! API key entity and token claims

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_details, validate_key_value, ApiKeyValidationError};

/// The server-side identity of an API key: a high-entropy opaque string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyValue(String);

impl ApiKeyValue {
    /// Create a new ApiKeyValue after validation
    pub fn new(value: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let value = value.into();
        validate_key_value(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form safe for logs
    pub fn prefix(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl TryFrom<String> for ApiKeyValue {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyValue> for String {
    fn from(value: ApiKeyValue) -> Self {
        value.0
    }
}

impl std::fmt::Display for ApiKeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claims embedded in a signed API key token
///
/// All three fields are required; tokens missing any of them fail to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyClaims {
    /// Server-side key value this token stands for
    pub key: String,
    /// Free-text label
    pub details: String,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
}

impl ApiKeyClaims {
    pub fn new(key: &ApiKeyValue, details: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: key.as_str().to_string(),
            details: details.into(),
            exp: expires_at.timestamp(),
        }
    }

    /// Check the claim values beyond their presence
    pub fn validate(&self) -> Result<ApiKeyValue, ApiKeyValidationError> {
        validate_details(&self.details)?;
        ApiKeyValue::new(self.key.clone())
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// A persisted API key record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Store-assigned row id (None until persisted)
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    key: ApiKeyValue,
    deadline: DateTime<Utc>,
    details: String,
    /// Last token signed for this key; never persisted
    #[serde(skip)]
    signed: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new, not yet persisted API key
    pub fn new(key: ApiKeyValue, details: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        let now = Utc::now();

        Self {
            id: None,
            key,
            deadline,
            details: details.into(),
            signed: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a key from stored columns
    pub fn from_parts(
        id: i64,
        key: ApiKeyValue,
        deadline: DateTime<Utc>,
        details: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            key,
            deadline,
            details,
            signed: None,
            created_at,
            updated_at,
        }
    }

    /// Materialize a record from verified token claims
    pub fn from_claims(key: ApiKeyValue, claims: &ApiKeyClaims) -> Self {
        Self::new(key, claims.details.clone(), claims.expires_at())
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_signed(mut self, signed: impl Into<String>) -> Self {
        self.signed = Some(signed.into());
        self
    }

    // Getters

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn key(&self) -> &ApiKeyValue {
        &self.key
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn signed(&self) -> Option<&str> {
        self.signed.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.deadline
    }

    // Mutators

    /// Move the deadline and remember the token re-signed for it
    pub fn extend(&mut self, deadline: DateTime<Utc>, signed: impl Into<String>) {
        self.deadline = deadline;
        self.signed = Some(signed.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key_value() -> ApiKeyValue {
        ApiKeyValue::new("0123456789abcdef").unwrap()
    }

    #[test]
    fn test_key_value_prefix() {
        assert_eq!(key_value().prefix(), "01234567");
        assert_eq!(ApiKeyValue::new("abc").unwrap().prefix(), "abc");
    }

    #[test]
    fn test_key_value_rejects_invalid() {
        assert!(ApiKeyValue::new("").is_err());
        assert!(ApiKeyValue::new("has space").is_err());
    }

    #[test]
    fn test_key_value_serde_validates() {
        let parsed: Result<ApiKeyValue, _> = serde_json::from_str("\"bad key\"");
        assert!(parsed.is_err());

        let parsed: ApiKeyValue = serde_json::from_str("\"good-key\"").unwrap();
        assert_eq!(parsed.as_str(), "good-key");
    }

    #[test]
    fn test_claims_require_all_fields() {
        let missing_details = r#"{"key":"abc","exp":1}"#;
        assert!(serde_json::from_str::<ApiKeyClaims>(missing_details).is_err());

        let missing_key = r#"{"details":"d","exp":1}"#;
        assert!(serde_json::from_str::<ApiKeyClaims>(missing_key).is_err());

        let wrong_type = r#"{"key":42,"details":"d","exp":1}"#;
        assert!(serde_json::from_str::<ApiKeyClaims>(wrong_type).is_err());
    }

    #[test]
    fn test_claims_expiry() {
        let future = Utc::now() + Duration::hours(1);
        let claims = ApiKeyClaims::new(&key_value(), "details", future);
        assert!(!claims.is_expired());
        assert_eq!(claims.expires_at().timestamp(), future.timestamp());

        let past = Utc::now() - Duration::hours(1);
        let claims = ApiKeyClaims::new(&key_value(), "details", past);
        assert!(claims.is_expired());
    }

    #[test]
    fn test_claims_validate() {
        let claims = ApiKeyClaims {
            key: "not valid!".to_string(),
            details: String::new(),
            exp: 0,
        };
        assert!(claims.validate().is_err());

        let claims = ApiKeyClaims::new(&key_value(), "ok", Utc::now());
        assert_eq!(claims.validate().unwrap(), key_value());
    }

    #[test]
    fn test_api_key_from_claims() {
        let deadline = Utc::now() + Duration::days(3);
        let claims = ApiKeyClaims::new(&key_value(), "partner integration", deadline);
        let key = ApiKey::from_claims(key_value(), &claims);

        assert!(key.id().is_none());
        assert_eq!(key.details(), "partner integration");
        assert_eq!(key.deadline().timestamp(), deadline.timestamp());
        assert!(!key.is_expired());
    }

    #[test]
    fn test_extend_updates_deadline_and_timestamp() {
        let mut key = ApiKey::new(key_value(), "d", Utc::now() - Duration::hours(1));
        let before = key.updated_at();
        assert!(key.is_expired());

        key.extend(Utc::now() + Duration::hours(1), "signed.token.value");

        assert!(!key.is_expired());
        assert!(key.updated_at() >= before);
        assert_eq!(key.signed(), Some("signed.token.value"));
    }

    #[test]
    fn test_signed_is_not_serialized() {
        let key = ApiKey::new(key_value(), "d", Utc::now()).with_signed("secret.token");
        let json = serde_json::to_string(&key).unwrap();
        assert!(!json.contains("secret.token"));
    }
}
