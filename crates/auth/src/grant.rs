//! Grants: per-(role, resource) CRUD permission rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use menugate_core::{DomainError, GrantId, ResourceId, RoleId};

use crate::permissions::CrudFlags;
use crate::resource::ResourceNode;

/// A persisted grant row. At most one exists per (role, resource) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub flags: CrudFlags,
}

impl Grant {
    pub fn new(role_id: RoleId, resource_id: ResourceId, flags: CrudFlags) -> Self {
        Self {
            id: GrantId::new(),
            role_id,
            resource_id,
            flags,
        }
    }
}

/// One entry of a bulk grant replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSpec {
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub flags: CrudFlags,
}

impl GrantSpec {
    pub fn new(resource_id: ResourceId, flags: CrudFlags) -> Self {
        Self { resource_id, flags }
    }
}

/// A role's grant joined with the resource it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrant {
    pub role_id: RoleId,
    pub resource: ResourceNode,
    pub flags: CrudFlags,
}

/// Validate the input of `replace_grants_for_role` before touching storage.
///
/// A resource may appear at most once per role.
pub fn normalize_grant_set(specs: Vec<GrantSpec>) -> Result<Vec<GrantSpec>, DomainError> {
    let mut seen = HashSet::with_capacity(specs.len());
    for spec in &specs {
        if !seen.insert(spec.resource_id) {
            return Err(DomainError::validation(format!(
                "resource {} listed more than once in grant set",
                spec.resource_id
            )));
        }
    }
    Ok(specs)
}
