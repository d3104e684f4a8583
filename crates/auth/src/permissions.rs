use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// CRUD action a caller wants to perform on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    /// Wire name of the flag that gates this action.
    pub fn flag_name(self) -> &'static str {
        match self {
            Action::Create => "can_create",
            Action::Read => "can_read",
            Action::Update => "can_update",
            Action::Delete => "can_delete",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "can_create" => Ok(Action::Create),
            "read" | "can_read" => Ok(Action::Read),
            "update" | "can_update" => Ok(Action::Update),
            "delete" | "can_delete" => Ok(Action::Delete),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}' (expected create, read, update or delete)")]
pub struct UnknownAction(pub String);

/// The four CRUD flags of a grant. Every flag defaults to `false`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrudFlags {
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl CrudFlags {
    pub const NONE: CrudFlags = CrudFlags {
        can_create: false,
        can_read: false,
        can_update: false,
        can_delete: false,
    };

    pub const ALL: CrudFlags = CrudFlags {
        can_create: true,
        can_read: true,
        can_update: true,
        can_delete: true,
    };

    pub fn new(can_create: bool, can_read: bool, can_update: bool, can_delete: bool) -> Self {
        Self {
            can_create,
            can_read,
            can_update,
            can_delete,
        }
    }

    pub fn read_only() -> Self {
        Self {
            can_read: true,
            ..Self::NONE
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.can_create,
            Action::Read => self.can_read,
            Action::Update => self.can_update,
            Action::Delete => self.can_delete,
        }
    }

    /// Flag-wise logical OR.
    pub fn union(self, other: CrudFlags) -> CrudFlags {
        CrudFlags {
            can_create: self.can_create || other.can_create,
            can_read: self.can_read || other.can_read,
            can_update: self.can_update || other.can_update,
            can_delete: self.can_delete || other.can_delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Actions this flag set allows, in CRUD order.
    pub fn allowed_actions(&self) -> Vec<Action> {
        Action::ALL.into_iter().filter(|a| self.allows(*a)).collect()
    }
}
