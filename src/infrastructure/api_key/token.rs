//! RS256 token signing and verification

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt::Debug;

use super::keypair::SigningKeypair;
use crate::domain::api_key::{ApiKeyClaims, ApiKeyError};
use crate::domain::DomainError;

/// Signs claim sets with the private key and verifies tokens with the public key
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_pem: String,
    fingerprint: String,
}

impl Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &Algorithm::RS256)
            .field("fingerprint", &self.fingerprint)
            .field("encoding_key", &"[hidden]")
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer from the process keypair
    pub fn new(keypair: &SigningKeypair) -> Result<Self, DomainError> {
        let private_pem = keypair.private_pem()?;
        let public_pem = keypair.public_pkcs1_pem()?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| DomainError::configuration(format!("Failed to create encoding key: {}", e)))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| DomainError::configuration(format!("Failed to create decoding key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            public_key_pem: keypair.public_pem()?,
            fingerprint: keypair.fingerprint(),
        })
    }

    /// PEM public key for verifying tokens outside the gateway
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Sign a claim set
    pub fn sign(&self, claims: &ApiKeyClaims) -> Result<String, ApiKeyError> {
        claims.validate()?;

        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key)
            .map_err(|e| ApiKeyError::Signing(e.to_string()))
    }

    /// Verify signature and embedded expiry, then return the typed claims
    pub fn verify(&self, token: &str) -> Result<ApiKeyClaims, ApiKeyError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<ApiKeyClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        data.claims.validate()?;
        Ok(data.claims)
    }

    /// Decode the claims without checking signature or expiry.
    ///
    /// Only for locating the stored record of a token about to be re-signed;
    /// never use the result as proof of authorization.
    pub fn parse_unverified(&self, token: &str) -> Result<ApiKeyClaims, ApiKeyError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<ApiKeyClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(map_jwt_error)?;

        data.claims.validate()?;
        Ok(data.claims)
    }
}

fn map_jwt_error(error: jsonwebtoken::errors::Error) -> ApiKeyError {
    match error.kind() {
        ErrorKind::ExpiredSignature => ApiKeyError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => ApiKeyError::InvalidSignature,
        _ => ApiKeyError::Malformed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ApiKeyValue;
    use crate::test_support::{other_keypair, test_keypair};
    use chrono::{Duration, Utc};

    fn signer() -> TokenSigner {
        TokenSigner::new(&test_keypair()).unwrap()
    }

    fn claims(offset: Duration) -> ApiKeyClaims {
        let key = ApiKeyValue::new("a1b2c3d4e5f6").unwrap();
        ApiKeyClaims::new(&key, "billing system", Utc::now() + offset)
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let original = claims(Duration::hours(1));
        let token = signer.sign(&original).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(signer.verify(&token).unwrap(), original);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let token = signer.sign(&claims(Duration::hours(-1))).unwrap();
        assert!(matches!(signer.verify(&token), Err(ApiKeyError::Expired)));
    }

    #[test]
    fn test_foreign_keypair_rejected() {
        let foreign = TokenSigner::new(&other_keypair()).unwrap();
        let token = foreign.sign(&claims(Duration::hours(1))).unwrap();
        assert!(matches!(
            signer().verify(&token),
            Err(ApiKeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = signer();
        let token = signer.sign(&claims(Duration::hours(1))).unwrap();
        let other = signer.sign(&claims(Duration::hours(2))).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(
            signer.verify(&forged),
            Err(ApiKeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_token() {
        assert!(matches!(
            signer().verify("not-a-token"),
            Err(ApiKeyError::Malformed(_))
        ));
    }

    #[test]
    fn test_hs256_token_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims(Duration::hours(1)),
            &EncodingKey::from_secret(b"shared"),
        )
        .unwrap();
        assert!(matches!(
            signer().verify(&token),
            Err(ApiKeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_parse_unverified_accepts_expired_and_foreign() {
        let signer = signer();
        let expired = signer.sign(&claims(Duration::hours(-5))).unwrap();
        assert_eq!(
            signer.parse_unverified(&expired).unwrap().key,
            "a1b2c3d4e5f6"
        );

        let foreign = TokenSigner::new(&other_keypair()).unwrap();
        let token = foreign.sign(&claims(Duration::hours(1))).unwrap();
        assert!(signer.parse_unverified(&token).is_ok());
    }

    #[test]
    fn test_missing_claim_rejected() {
        #[derive(serde::Serialize)]
        struct Partial {
            key: String,
            exp: i64,
        }

        let token = encode(
            &Header::new(Algorithm::RS256),
            &Partial {
                key: "abc".into(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_rsa_pem(test_keypair().private_pem().unwrap().as_bytes()).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            signer().verify(&token),
            Err(ApiKeyError::Malformed(_))
        ));
        assert!(signer().parse_unverified(&token).is_err());
    }
}
