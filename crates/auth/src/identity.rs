//! Identities (user accounts) as seen by the authorization core.
//!
//! The credential hash is opaque here: verification belongs to a
//! [`CredentialVerifier`](crate::session::CredentialVerifier) supplied by the host.

use serde::{Deserialize, Serialize};

use menugate_core::{DomainError, IdentityId};

/// Maximum username length accepted (matches the `blog_users.username` column).
pub const MAX_USERNAME_LEN: usize = 50;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    /// Identity may authenticate.
    #[default]
    Active,
    /// Identity is disabled and every session it holds is refused.
    Disabled,
}

impl core::fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IdentityStatus::Active => write!(f, "Active"),
            IdentityStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

/// An authenticated principal.
///
/// # Invariants
/// - At most one non-null `active_token` at any instant (single active session).
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    #[serde(skip)]
    pub credential_hash: String,
    pub status: IdentityStatus,
    #[serde(skip)]
    pub active_token: Option<String>,
}

impl core::fmt::Debug for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential_hash", &"<redacted>")
            .field("status", &self.status)
            .field("active_token", &self.active_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Identity {
    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }

    pub fn has_session(&self) -> bool {
        self.active_token.is_some()
    }
}

/// Input for creating an identity.
#[derive(Clone)]
pub struct NewIdentity {
    pub id: IdentityId,
    pub username: String,
    pub credential_hash: String,
    pub status: IdentityStatus,
}

impl core::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl NewIdentity {
    pub fn new(username: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(),
            username: username.into(),
            credential_hash: credential_hash.into(),
            status: IdentityStatus::Active,
        }
    }

    pub fn with_id(mut self, id: IdentityId) -> Self {
        self.id = id;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.status = IdentityStatus::Disabled;
        self
    }

    /// Validate and turn into a stored identity (no session yet).
    pub fn into_identity(self) -> Result<Identity, DomainError> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::validation(format!(
                "username longer than {MAX_USERNAME_LEN} characters"
            )));
        }
        if self.credential_hash.is_empty() {
            return Err(DomainError::validation("credential hash cannot be empty"));
        }

        Ok(Identity {
            id: self.id,
            username,
            credential_hash: self.credential_hash,
            status: self.status,
            active_token: None,
        })
    }
}
