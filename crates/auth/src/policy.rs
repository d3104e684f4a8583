//! Policy evaluator: the `Authenticate` / `Authorize` surface used by
//! request handlers.
//!
//! Stateless between calls: every invocation loads what it needs from
//! storage, merges, and returns a fresh value. Nothing is cached or shared
//! across requests.

use serde::Serialize;
use tracing::instrument;

use menugate_core::IdentityId;

use crate::authorize::{self, AuthzError, PermissionNode, build_permission_tree};
use crate::error::AuthError;
use crate::grant::ResourceGrant;
use crate::identity::Identity;
use crate::merge::{MergedGrant, merge_permissions};
use crate::permissions::Action;
use crate::resource::{ResourceNode, TreeNode, build_resource_tree};
use crate::roles::Role;
use crate::session::{CredentialVerifier, LoginOutcome, SessionAuthority};
use crate::store::{AuthStore, GrantStore, ResourceStore, RoleStore};
use crate::token::TokenSigner;

/// A resolved, authenticated caller.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub identity: Identity,
    pub roles: Vec<Role>,
    /// Flat merged grants, one per resource id.
    #[serde(skip)]
    pub merged: Vec<MergedGrant>,
    /// The same grants in tree shape; this is the client payload.
    pub permissions: Vec<PermissionNode>,
}

impl AuthResult {
    pub fn identity_id(&self) -> IdentityId {
        self.identity.id
    }

    pub fn authorize(&self, resource_name: &str, action: Action) -> bool {
        authorize::authorize(&self.permissions, resource_name, action)
    }

    pub fn require(&self, resource_name: &str, action: Action) -> Result<(), AuthzError> {
        authorize::require(&self.permissions, resource_name, action)
    }
}

pub struct PolicyEvaluator<S, T> {
    sessions: SessionAuthority<S, T>,
}

impl<S, T> PolicyEvaluator<S, T>
where
    S: AuthStore,
    T: TokenSigner,
{
    pub fn new(store: S, signer: T) -> Self {
        Self {
            sessions: SessionAuthority::new(store, signer),
        }
    }

    pub fn sessions(&self) -> &SessionAuthority<S, T> {
        &self.sessions
    }

    pub fn store(&self) -> &S {
        self.sessions.store()
    }

    pub async fn login(
        &self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        self.sessions.login(verifier, username, password).await
    }

    /// Validate the session token, then load and merge the caller's grants.
    pub async fn authenticate(&self, raw_token: &str) -> Result<AuthResult, AuthError> {
        self.authenticate_at(raw_token, chrono::Utc::now()).await
    }

    /// Like [`authenticate`](Self::authenticate) with an explicit clock.
    pub async fn authenticate_at(
        &self,
        raw_token: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<AuthResult, AuthError> {
        let token = raw_token.trim();
        if token.is_empty() {
            return Err(AuthError::Unauthenticated("missing token".to_string()));
        }

        let identity = self.sessions.validate_at(token, now).await?;
        self.resolve(identity).await
    }

    #[instrument(skip(self, identity), fields(identity_id = %identity.id))]
    async fn resolve(&self, identity: Identity) -> Result<AuthResult, AuthError> {
        let (roles, merged) = self.load_permissions(identity.id).await?;
        let permissions = build_permission_tree(&merged);

        Ok(AuthResult {
            identity,
            roles,
            merged,
            permissions,
        })
    }

    /// Roles of the identity and their merged grants.
    pub async fn load_permissions(
        &self,
        identity_id: IdentityId,
    ) -> Result<(Vec<Role>, Vec<MergedGrant>), AuthError> {
        let store = self.store();
        let roles = store.find_roles_for_identity(identity_id).await?;

        let mut records: Vec<ResourceGrant> = Vec::new();
        for role in &roles {
            records.extend(store.find_grants_for_role(role.id).await?);
        }

        let merged = merge_permissions(&records);
        tracing::debug!(
            roles = roles.len(),
            grant_rows = records.len(),
            resources = merged.len(),
            "permissions merged"
        );
        Ok((roles, merged))
    }

    /// The full resource forest, for operator screens.
    pub async fn resource_tree(&self) -> Result<Vec<TreeNode<ResourceNode>>, AuthError> {
        let nodes = self.store().find_all_resource_nodes().await?;
        Ok(build_resource_tree(&nodes))
    }
}
