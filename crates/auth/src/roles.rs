use serde::{Deserialize, Serialize};

use menugate_core::{DomainError, RoleId};

/// A named bundle of grants. Many-to-many with identities.
///
/// Roles exist independently of resources; what a role may do is described
/// entirely by its [`Grant`](crate::grant::Grant) rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Result<Self, DomainError> {
        Self::with_id(RoleId::new(), name, description)
    }

    pub fn with_id(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.chars().count() > 50 {
            return Err(DomainError::validation("role name longer than 50 characters"));
        }

        Ok(Self {
            id,
            name,
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}
