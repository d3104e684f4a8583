//! Storage ports consumed by the authorization core.
//!
//! Implemented by `menugate-infra` (in-memory and Postgres). Two requirements
//! hold for every implementation:
//!
//! - `set_active_token` is a single atomic write, so a concurrent
//!   `get_active_token` observes either the old or the new value.
//! - `replace_grants_for_role` is transactional: no reader ever observes the
//!   role with zero grants or a mix of the old and new sets, and an aborted
//!   replacement leaves the old set in place.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use menugate_core::{DomainError, IdentityId, ResourceId, RoleId};

use crate::grant::{Grant, GrantSpec, ResourceGrant};
use crate::identity::{Identity, IdentityStatus, NewIdentity};
use crate::permissions::CrudFlags;
use crate::resource::ResourceNode;
use crate::roles::Role;

/// Storage operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid: {0}")]
    Invalid(String),

    /// Transient infrastructure failure; the only retryable kind.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        StoreError::Invalid(err.to_string())
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError>;

    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;

    /// Lookup by login name. Credential verification happens elsewhere.
    async fn find_identity_by_credential(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn set_identity_status(&self, id: IdentityId, status: IdentityStatus) -> Result<(), StoreError>;

    /// Overwrite (or clear, with `None`) the single active session token.
    async fn set_active_token(&self, id: IdentityId, token: Option<&str>) -> Result<(), StoreError>;

    async fn get_active_token(&self, id: IdentityId) -> Result<Option<String>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_role(&self, role: Role) -> Result<Role, StoreError>;

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Deletes the role, its grants and its assignments.
    async fn delete_role(&self, id: RoleId) -> Result<(), StoreError>;

    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError>;

    async fn revoke_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError>;

    /// Roles held by the identity, ordered by name then id.
    async fn find_roles_for_identity(&self, identity_id: IdentityId) -> Result<Vec<Role>, StoreError>;
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn create_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError>;

    /// Refuses a parent change that would close a cycle.
    async fn update_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError>;

    /// Deletes the node and cascades its grants. Children keep their (now
    /// dangling) parent reference and surface as roots.
    async fn delete_resource(&self, id: ResourceId) -> Result<(), StoreError>;

    async fn find_all_resource_nodes(&self) -> Result<Vec<ResourceNode>, StoreError>;
}

/// The permission matrix: grants keyed by (role, resource).
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Fails with `Conflict` when the pair already has a grant.
    async fn create_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError>;

    async fn get_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<Grant>, StoreError>;

    /// Fails with `NotFound` when the pair has no grant.
    async fn update_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError>;

    /// Create or overwrite the grant of one pair.
    async fn upsert_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError>;

    async fn delete_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<(), StoreError>;

    async fn list_grants_for_role(&self, role_id: RoleId) -> Result<Vec<Grant>, StoreError>;

    /// The role's grants joined with their resources, ordered by resource
    /// display order then id.
    async fn find_grants_for_role(&self, role_id: RoleId) -> Result<Vec<ResourceGrant>, StoreError>;

    /// Atomically discard every grant of the role and install `grants`.
    async fn replace_grants_for_role(
        &self,
        role_id: RoleId,
        grants: Vec<GrantSpec>,
    ) -> Result<Vec<Grant>, StoreError>;
}

/// Everything the policy evaluator needs from storage.
pub trait AuthStore: IdentityStore + RoleStore + ResourceStore + GrantStore {}

impl<T> AuthStore for T where T: IdentityStore + RoleStore + ResourceStore + GrantStore {}

#[async_trait]
impl<T: IdentityStore + ?Sized> IdentityStore for Arc<T> {
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        (**self).create_identity(identity).await
    }

    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        (**self).find_identity(id).await
    }

    async fn find_identity_by_credential(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        (**self).find_identity_by_credential(username).await
    }

    async fn set_identity_status(&self, id: IdentityId, status: IdentityStatus) -> Result<(), StoreError> {
        (**self).set_identity_status(id, status).await
    }

    async fn set_active_token(&self, id: IdentityId, token: Option<&str>) -> Result<(), StoreError> {
        (**self).set_active_token(id, token).await
    }

    async fn get_active_token(&self, id: IdentityId) -> Result<Option<String>, StoreError> {
        (**self).get_active_token(id).await
    }
}

#[async_trait]
impl<T: RoleStore + ?Sized> RoleStore for Arc<T> {
    async fn create_role(&self, role: Role) -> Result<Role, StoreError> {
        (**self).create_role(role).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        (**self).list_roles().await
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), StoreError> {
        (**self).delete_role(id).await
    }

    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        (**self).assign_role(identity_id, role_id).await
    }

    async fn revoke_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), StoreError> {
        (**self).revoke_role(identity_id, role_id).await
    }

    async fn find_roles_for_identity(&self, identity_id: IdentityId) -> Result<Vec<Role>, StoreError> {
        (**self).find_roles_for_identity(identity_id).await
    }
}

#[async_trait]
impl<T: ResourceStore + ?Sized> ResourceStore for Arc<T> {
    async fn create_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        (**self).create_resource(node).await
    }

    async fn update_resource(&self, node: ResourceNode) -> Result<ResourceNode, StoreError> {
        (**self).update_resource(node).await
    }

    async fn delete_resource(&self, id: ResourceId) -> Result<(), StoreError> {
        (**self).delete_resource(id).await
    }

    async fn find_all_resource_nodes(&self) -> Result<Vec<ResourceNode>, StoreError> {
        (**self).find_all_resource_nodes().await
    }
}

#[async_trait]
impl<T: GrantStore + ?Sized> GrantStore for Arc<T> {
    async fn create_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        (**self).create_grant(role_id, resource_id, flags).await
    }

    async fn get_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<Grant>, StoreError> {
        (**self).get_grant(role_id, resource_id).await
    }

    async fn update_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        (**self).update_grant(role_id, resource_id, flags).await
    }

    async fn upsert_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: CrudFlags,
    ) -> Result<Grant, StoreError> {
        (**self).upsert_grant(role_id, resource_id, flags).await
    }

    async fn delete_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<(), StoreError> {
        (**self).delete_grant(role_id, resource_id).await
    }

    async fn list_grants_for_role(&self, role_id: RoleId) -> Result<Vec<Grant>, StoreError> {
        (**self).list_grants_for_role(role_id).await
    }

    async fn find_grants_for_role(&self, role_id: RoleId) -> Result<Vec<ResourceGrant>, StoreError> {
        (**self).find_grants_for_role(role_id).await
    }

    async fn replace_grants_for_role(
        &self,
        role_id: RoleId,
        grants: Vec<GrantSpec>,
    ) -> Result<Vec<Grant>, StoreError> {
        (**self).replace_grants_for_role(role_id, grants).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_become_invalid_and_are_not_retryable() {
        let err = StoreError::from(DomainError::invariant("resource cannot be its own parent"));
        assert!(matches!(&err, StoreError::Invalid(msg) if msg.contains("own parent")));
        assert!(!err.is_retryable());
        assert!(StoreError::Unavailable("pool timed out".into()).is_retryable());
    }
}
