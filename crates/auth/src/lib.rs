//! `menugate-auth` — the authorization core.
//!
//! Decides whether an authenticated caller may create, read, update or delete
//! a named administrative resource. Decoupled from HTTP and from any storage
//! technology: storage is reached through the ports in [`store`].

pub mod authorize;
pub mod claims;
pub mod error;
pub mod grant;
pub mod identity;
pub mod merge;
pub mod permissions;
pub mod policy;
pub mod resource;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, PermissionNode, authorize, build_permission_tree,
    explain_authorization, find_resource, require,
};
pub use claims::{CLOCK_SKEW_LEEWAY_SECS, SessionClaims, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use grant::{Grant, GrantSpec, ResourceGrant, normalize_grant_set};
pub use identity::{Identity, IdentityStatus, NewIdentity};
pub use merge::{MergedGrant, merge_permissions};
pub use permissions::{Action, CrudFlags, UnknownAction};
pub use policy::{AuthResult, PolicyEvaluator};
pub use resource::{
    ResourceNode, TreeItem, TreeNode, build_resource_tree, build_tree, flatten_tree, would_create_cycle,
};
pub use roles::Role;
pub use session::{CredentialError, CredentialVerifier, LoginOutcome, SessionAuthority, SessionState};
pub use store::{AuthStore, GrantStore, IdentityStore, ResourceStore, RoleStore, StoreError};
pub use token::{
    DEFAULT_TOKEN_TTL_SECS, Hs256TokenSigner, IssuedToken, MAX_TOKEN_TTL_SECS, TokenError, TokenSigner,
};
