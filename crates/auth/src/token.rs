//! Signed-token primitive: `issue(identity) -> token`, `verify(token) -> claims`.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use menugate_core::IdentityId;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

/// Default session lifetime: one hour.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Longest session lifetime a signer accepts: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature or structure did not verify.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Structurally valid, but past its expiry.
    #[error("token has expired")]
    Expired,

    /// Structurally valid, but the claims window is unusable.
    #[error("invalid token claims: {0}")]
    InvalidClaims(TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid signer configuration: {0}")]
    Configuration(String),
}

/// A freshly issued session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

/// Issues and verifies session tokens. Opaque beyond success and payload.
pub trait TokenSigner: Send + Sync {
    fn issue(&self, identity_id: IdentityId, now: DateTime<Utc>) -> Result<IssuedToken, TokenError>;

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// HMAC-SHA256 signed JWTs.
#[derive(Clone)]
pub struct Hs256TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256TokenSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenSigner").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Hs256TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::Configuration("signing secret is empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(TokenError::Configuration("token ttl must be positive".to_string()));
        }
        if ttl > Duration::seconds(MAX_TOKEN_TTL_SECS) {
            return Err(TokenError::Configuration(format!(
                "token ttl exceeds {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        // Expiry is checked against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation
    }
}

impl TokenSigner for Hs256TokenSigner {
    fn issue(&self, identity_id: IdentityId, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;

        let claims = SessionClaims {
            sub: identity_id,
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        match validate_claims(&data.claims, now) {
            Ok(()) => Ok(data.claims),
            Err(TokenValidationError::Expired) => Err(TokenError::Expired),
            Err(other) => Err(TokenError::InvalidClaims(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Hs256TokenSigner {
        Hs256TokenSigner::new("test-secret", Duration::minutes(10)).unwrap()
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let now = Utc::now();
        let id = IdentityId::new();
        let issued = signer().issue(id, now).unwrap();

        let claims = signer().verify(&issued.token, now).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn two_issues_at_same_instant_differ() {
        let now = Utc::now();
        let id = IdentityId::new();
        let a = signer().issue(id, now).unwrap();
        let b = signer().issue(id, now).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expired_is_distinct_from_malformed() {
        let now = Utc::now();
        let issued = signer().issue(IdentityId::new(), now).unwrap();

        assert_eq!(
            signer().verify(&issued.token, now + Duration::minutes(11)),
            Err(TokenError::Expired)
        );
        assert!(matches!(
            signer().verify("not.a.jwt", now),
            Err(TokenError::Malformed(_))
        ));

        let other = Hs256TokenSigner::new("other-secret", Duration::minutes(10)).unwrap();
        assert!(matches!(other.verify(&issued.token, now), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn rejects_empty_secret_and_non_positive_ttl() {
        assert!(Hs256TokenSigner::new("", Duration::minutes(1)).is_err());
        assert!(Hs256TokenSigner::new("s", Duration::zero()).is_err());
    }

    #[test]
    fn oversized_ttl_is_a_configuration_error() {
        assert!(matches!(
            Hs256TokenSigner::new("s", Duration::days(365 * 300_000)),
            Err(TokenError::Configuration(_))
        ));
        assert!(Hs256TokenSigner::new("s", Duration::seconds(MAX_TOKEN_TTL_SECS)).is_ok());
    }

    #[test]
    fn expiry_past_the_calendar_is_a_signing_error() {
        let signer = Hs256TokenSigner::new("s", Duration::seconds(MAX_TOKEN_TTL_SECS)).unwrap();
        assert!(matches!(
            signer.issue(IdentityId::new(), DateTime::<Utc>::MAX_UTC),
            Err(TokenError::Signing(_))
        ));
    }
}
