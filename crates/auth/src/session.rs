//! Session authority: one active session per identity.
//!
//! Per identity the state is either `NoSession` or `ActiveSession(token)`.
//! Each successful login overwrites the stored token, which invalidates every
//! earlier token without a revocation list: an old token simply stops being
//! equal to the stored one. Logout and administrative revocation clear it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use menugate_core::IdentityId;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::store::{IdentityStore, StoreError};
use crate::token::TokenSigner;

/// Password check, supplied by the host. The hash format is opaque here.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, presented: &str, stored_hash: &str) -> Result<bool, CredentialError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("credential verification failed: {0}")]
pub struct CredentialError(pub String);

/// Session state of one identity.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    ActiveSession(String),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::ActiveSession(_))
    }
}

impl core::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionState::NoSession => f.write_str("NoSession"),
            SessionState::ActiveSession(_) => f.write_str("ActiveSession(<redacted>)"),
        }
    }
}

/// Result of a successful login.
#[derive(Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Whether an earlier session was displaced by this login.
    pub superseded_previous: bool,
}

impl core::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("superseded_previous", &self.superseded_previous)
            .finish()
    }
}

/// Issues and validates the single active session credential per identity.
pub struct SessionAuthority<S, T> {
    store: S,
    signer: T,
}

impl<S, T> SessionAuthority<S, T>
where
    S: IdentityStore,
    T: TokenSigner,
{
    pub fn new(store: S, signer: T) -> Self {
        Self { store, signer }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn login(
        &self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        self.login_at(verifier, username, password, Utc::now()).await
    }

    /// Verify credentials and make a fresh token the identity's only session.
    pub async fn login_at(
        &self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(mut identity) = self.store.find_identity_by_credential(username.trim()).await? else {
            debug!("login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        match verifier.verify(password, &identity.credential_hash) {
            Ok(true) => {}
            Ok(false) => {
                debug!(identity_id = %identity.id, "login rejected: wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                warn!(identity_id = %identity.id, error = %e, "credential verifier failed");
                return Err(AuthError::InvalidCredentials);
            }
        }

        if !identity.is_active() {
            debug!(identity_id = %identity.id, "login rejected: identity disabled");
            return Err(AuthError::IdentityDisabled);
        }

        let issued = self.signer.issue(identity.id, now)?;

        self.store
            .set_active_token(identity.id, Some(&issued.token))
            .await
            .map_err(identity_store_error)?;

        let superseded_previous = identity.active_token.is_some();
        if superseded_previous {
            info!(identity_id = %identity.id, "new login superseded previous session");
        }
        info!(identity_id = %identity.id, expires_at = %issued.claims.expires_at, "login succeeded");

        identity.active_token = Some(issued.token.clone());
        Ok(LoginOutcome {
            identity,
            token: issued.token,
            expires_at: issued.claims.expires_at,
            superseded_previous,
        })
    }

    pub async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    /// Validate a presented token.
    ///
    /// Checks, in order: signature and structure, expiry, identity existence,
    /// identity status, and equality with the stored active token.
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = self.signer.verify(token, now).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::from(e)
        })?;

        let found = self.store.find_identity(claims.sub).await.map_err(identity_store_error)?;
        let Some(identity) = found else {
            debug!(identity_id = %claims.sub, "token names unknown identity");
            return Err(AuthError::IdentityNotFound);
        };

        if !identity.is_active() {
            debug!(identity_id = %identity.id, "token names disabled identity");
            return Err(AuthError::IdentityDisabled);
        }

        // The identity can disappear between the two reads.
        let current = self
            .store
            .get_active_token(identity.id)
            .await
            .map_err(identity_store_error)?;
        match current {
            Some(stored) if tokens_equal(&stored, token) => Ok(identity),
            _ => {
                debug!(identity_id = %identity.id, "token is not the current session");
                Err(AuthError::SessionSuperseded)
            }
        }
    }

    /// End the identity's session at its own request.
    pub async fn logout(&self, identity_id: IdentityId) -> Result<(), AuthError> {
        self.store
            .set_active_token(identity_id, None)
            .await
            .map_err(identity_store_error)?;
        info!(identity_id = %identity_id, "logged out");
        Ok(())
    }

    /// End the identity's session on an operator's behalf.
    pub async fn revoke(&self, identity_id: IdentityId) -> Result<(), AuthError> {
        self.store
            .set_active_token(identity_id, None)
            .await
            .map_err(identity_store_error)?;
        info!(identity_id = %identity_id, "session revoked");
        Ok(())
    }

    pub async fn session_state(&self, identity_id: IdentityId) -> Result<SessionState, AuthError> {
        let token = self
            .store
            .get_active_token(identity_id)
            .await
            .map_err(identity_store_error)?;
        Ok(match token {
            Some(token) => SessionState::ActiveSession(token),
            None => SessionState::NoSession,
        })
    }
}

fn identity_store_error(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound(_) => AuthError::IdentityNotFound,
        other => other.into(),
    }
}

/// Length-revealing but otherwise constant-time comparison.
fn tokens_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
