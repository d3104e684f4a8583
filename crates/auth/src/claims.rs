use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use menugate_core::IdentityId;

/// Session token claims (transport-agnostic).
///
/// The minimal set the session authority needs once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / identity identifier.
    pub sub: IdentityId,

    /// Unique per issuance, so two logins within one clock tick still
    /// produce different tokens.
    pub jti: Uuid,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Tolerated clock difference between the issuing and the validating node.
pub const CLOCK_SKEW_LEEWAY_SECS: i64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate session claims.
///
/// Validates the *claims* only; signature verification happens in the
/// [`TokenSigner`](crate::token::TokenSigner).
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if claims.issued_at.signed_duration_since(now) > Duration::seconds(CLOCK_SKEW_LEEWAY_SECS) {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
