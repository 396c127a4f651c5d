use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::credential::Credential;

/// Terminal failure states of access-token validation.
///
/// `Invalid` covers everything that prevents trusting the payload
/// (malformed, bad signature, unexpected algorithm, missing claims).
/// `Expired` is only reported once the signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("no access token presented")]
    Empty,
    #[error("access token rejected: {0}")]
    Invalid(String),
    #[error("access token expired at {exp}")]
    Expired { exp: i64 },
}

/// Verified access-token claims.
///
/// Only `sub` and `exp` are interpreted; the rest (role, email, type, ...)
/// is carried as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: i64,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// HS256 access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
/// - Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: u64,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(secret: &[u8], leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiration is checked by hand after decoding so that an expired
        // token is only ever reported as such once its signature verified.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            leeway_seconds,
        }
    }

    pub fn validate(
        &self,
        credential: Option<&Credential>,
    ) -> Result<AccessTokenClaims, TokenError> {
        self.validate_at(credential, Utc::now().timestamp())
    }

    /// Same as `validate`, against an explicit clock reading (unix seconds).
    pub fn validate_at(
        &self,
        credential: Option<&Credential>,
        now: i64,
    ) -> Result<AccessTokenClaims, TokenError> {
        let credential = credential.ok_or(TokenError::Empty)?;

        let data = jsonwebtoken::decode::<AccessTokenClaims>(
            credential.as_str(),
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))?;

        let claims = data.claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("empty 'sub' claim".to_string()));
        }

        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if claims.exp <= now.saturating_sub(leeway) {
            return Err(TokenError::Expired { exp: claims.exp });
        }

        Ok(claims)
    }
}
