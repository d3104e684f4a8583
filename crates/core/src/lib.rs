//! `menugate-core` — shared primitives for the authorization workspace.
//!
//! Identifiers and the domain error model. No infrastructure concerns.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{GrantId, IdentityId, ResourceId, RoleId};
