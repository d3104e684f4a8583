use thiserror::Error;

use crate::store::StoreError;
use crate::token::TokenError;

/// Authentication outcome taxonomy.
///
/// Every variant is an expected result handed back to the caller. Only
/// [`AuthError::StorageUnavailable`] may be retried by a layer above; the
/// rest are terminal for the current request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or malformed token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("token has expired")]
    TokenExpired,

    /// Token is valid but is no longer the identity's current session
    /// (a newer login happened, or the session was cleared).
    #[error("session superseded by a newer login")]
    SessionSuperseded,

    #[error("identity is disabled")]
    IdentityDisabled,

    #[error("identity not found")]
    IdentityNotFound,

    /// Login only: unknown user or wrong password (deliberately not told apart).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login only: the token could not be produced.
    #[error("failed to issue session token: {0}")]
    TokenIssuance(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The store refused the operation (missing row, conflict, bad data).
    /// Retrying the same request gives the same answer.
    #[error("storage rejected the operation: {0}")]
    StorageRejected(String),
}

impl AuthError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::StorageUnavailable(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated(_) => "unauthenticated",
            AuthError::TokenExpired => "token_expired",
            AuthError::SessionSuperseded => "session_superseded",
            AuthError::IdentityDisabled => "identity_disabled",
            AuthError::IdentityNotFound => "identity_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenIssuance(_) => "token_issuance_failed",
            AuthError::StorageUnavailable(_) => "storage_unavailable",
            AuthError::StorageRejected(_) => "storage_rejected",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AuthError::StorageUnavailable(msg),
            other => AuthError::StorageRejected(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed(msg) => AuthError::Unauthenticated(msg),
            TokenError::InvalidClaims(e) => AuthError::Unauthenticated(e.to_string()),
            TokenError::Signing(msg) | TokenError::Configuration(msg) => AuthError::TokenIssuance(msg),
        }
    }
}
