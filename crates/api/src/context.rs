use std::sync::Arc;

use menugate_auth::{Action, AuthResult, AuthzError, PermissionNode, Role};
use menugate_core::IdentityId;

/// Authenticated caller, inserted into request extensions by
/// [`auth_middleware`](crate::middleware::auth_middleware).
///
/// Built fresh for every request; never shared between requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    inner: Arc<AuthResult>,
}

impl AuthContext {
    pub fn new(result: AuthResult) -> Self {
        Self { inner: Arc::new(result) }
    }

    pub fn identity_id(&self) -> IdentityId {
        self.inner.identity_id()
    }

    pub fn username(&self) -> &str {
        &self.inner.identity.username
    }

    pub fn roles(&self) -> &[Role] {
        &self.inner.roles
    }

    pub fn permissions(&self) -> &[PermissionNode] {
        &self.inner.permissions
    }

    pub fn authorize(&self, resource_name: &str, action: Action) -> bool {
        self.inner.authorize(resource_name, action)
    }

    pub fn require(&self, resource_name: &str, action: Action) -> Result<(), AuthzError> {
        self.inner.require(resource_name, action)
    }
}
