//! Authorization against the merged permission tree.
//!
//! The merged grants of an identity are placed into the resource hierarchy
//! and searched by resource name. Search is pre-order depth-first: a node is
//! checked before its children, and each child's subtree is exhausted before
//! the next sibling. The first node whose name matches wins; names are not
//! required to be unique across the tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use menugate_core::ResourceId;

use crate::merge::MergedGrant;
use crate::permissions::{Action, CrudFlags};
use crate::resource::{TreeNode, build_tree};

/// Client-facing permission tree node.
///
/// The navigation UI renders menu entries directly from this shape, so the
/// field names and nesting are part of the wire contract:
/// `{id, name, can_create, can_read, can_update, can_delete, children}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionNode {
    pub id: ResourceId,
    pub name: String,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub children: Vec<PermissionNode>,
}

impl PermissionNode {
    pub fn flags(&self) -> CrudFlags {
        CrudFlags::new(self.can_create, self.can_read, self.can_update, self.can_delete)
    }

    pub fn allows(&self, action: Action) -> bool {
        self.flags().allows(action)
    }
}

impl From<TreeNode<MergedGrant>> for PermissionNode {
    fn from(node: TreeNode<MergedGrant>) -> Self {
        let TreeNode { item, children } = node;
        Self {
            id: item.resource.id,
            name: item.resource.name,
            can_create: item.flags.can_create,
            can_read: item.flags.can_read,
            can_update: item.flags.can_update,
            can_delete: item.flags.can_delete,
            children: children.into_iter().map(PermissionNode::from).collect(),
        }
    }
}

/// Place merged grants into the resource hierarchy.
///
/// A grant whose parent resource is not itself granted becomes a root.
pub fn build_permission_tree(merged: &[MergedGrant]) -> Vec<PermissionNode> {
    build_tree(merged).into_iter().map(PermissionNode::from).collect()
}

/// First node named `name` in pre-order.
pub fn find_resource<'a>(tree: &'a [PermissionNode], name: &str) -> Option<&'a PermissionNode> {
    for node in tree {
        if node.name == name {
            return Some(node);
        }
        if let Some(found) = find_resource(&node.children, name) {
            return Some(found);
        }
    }
    None
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Authenticated, but the grant is absent. Unknown resources land here too.
    #[error("forbidden: missing permission '{}' on '{resource}'", .action.flag_name())]
    Forbidden { resource: String, action: Action },
}

impl AuthzError {
    /// The permission that would have allowed the request, for diagnostics.
    pub fn required(&self) -> (&str, Action) {
        match self {
            AuthzError::Forbidden { resource, action } => (resource, *action),
        }
    }
}

/// Does the tree allow `action` on the resource named `resource_name`?
///
/// Unknown names yield `false`, never an error.
pub fn authorize(tree: &[PermissionNode], resource_name: &str, action: Action) -> bool {
    find_resource(tree, resource_name).is_some_and(|node| node.allows(action))
}

/// Like [`authorize`], but reports the missing permission on denial.
pub fn require(tree: &[PermissionNode], resource_name: &str, action: Action) -> Result<(), AuthzError> {
    if authorize(tree, resource_name, action) {
        Ok(())
    } else {
        tracing::debug!(resource = resource_name, action = %action, "authorization denied");
        Err(AuthzError::Forbidden {
            resource: resource_name.to_string(),
            action,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a request was allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub resource: String,
    pub action: Action,
    pub granted: bool,
    pub reason: String,
    /// Flags of the matched node, if any node matched by name.
    pub matched: Option<MatchedResource>,
    pub denial_reason: Option<DenialKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedResource {
    pub id: ResourceId,
    pub allowed_actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    ResourceNotFound,
    MissingPermission,
}

/// Explain the decision [`authorize`] would make.
pub fn explain_authorization(
    tree: &[PermissionNode],
    resource_name: &str,
    action: Action,
) -> AuthorizationExplanation {
    match find_resource(tree, resource_name) {
        None => AuthorizationExplanation {
            resource: resource_name.to_string(),
            action,
            granted: false,
            reason: format!("no resource named '{resource_name}' is granted to this identity"),
            matched: None,
            denial_reason: Some(DenialKind::ResourceNotFound),
        },
        Some(node) => {
            let granted = node.allows(action);
            let reason = if granted {
                format!("'{}' is set on '{resource_name}'", action.flag_name())
            } else {
                format!("'{}' is not set on '{resource_name}'", action.flag_name())
            };
            AuthorizationExplanation {
                resource: resource_name.to_string(),
                action,
                granted,
                reason,
                matched: Some(MatchedResource {
                    id: node.id,
                    allowed_actions: node.flags().allowed_actions(),
                }),
                denial_reason: (!granted).then_some(DenialKind::MissingPermission),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceNode;
    use uuid::Uuid;

    fn rid(n: u128) -> ResourceId {
        ResourceId::from_uuid(Uuid::from_u128(n))
    }

    fn merged(n: u128, name: &str, parent: Option<u128>, order: i32, flags: CrudFlags) -> MergedGrant {
        let mut resource = ResourceNode::new(name, format!("/{name}")).with_id(rid(n)).with_order(order);
        resource.parent_id = parent.map(rid);
        MergedGrant { resource, flags }
    }

    #[test]
    fn wire_format_is_exact() {
        let tree = build_permission_tree(&[
            merged(1, "Content", None, 0, CrudFlags::read_only()),
            merged(2, "Blog", Some(1), 0, CrudFlags::new(true, true, true, false)),
        ]);
        let json = serde_json::to_value(&tree).unwrap();
        let expected = serde_json::json!([{
            "id": rid(1).to_string(),
            "name": "Content",
            "can_create": false,
            "can_read": true,
            "can_update": false,
            "can_delete": false,
            "children": [{
                "id": rid(2).to_string(),
                "name": "Blog",
                "can_create": true,
                "can_read": true,
                "can_update": true,
                "can_delete": false,
                "children": []
            }]
        }]);
        assert_eq!(json, expected);

        let keys: Vec<&String> = json[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn unknown_resource_is_denied_not_an_error() {
        let tree = build_permission_tree(&[merged(1, "Blog", None, 0, CrudFlags::ALL)]);
        assert!(!authorize(&tree, "NoSuchResource", Action::Read));
        assert_eq!(
            require(&tree, "NoSuchResource", Action::Read),
            Err(AuthzError::Forbidden {
                resource: "NoSuchResource".to_string(),
                action: Action::Read,
            })
        );
    }

    #[test]
    fn first_preorder_match_wins_on_duplicate_names() {
        // Root A (order 0) has child "Dup" (read only); root B (order 1) is
        // also named "Dup" with full access. Pre-order visits A's subtree first.
        let tree = build_permission_tree(&[
            merged(1, "A", None, 0, CrudFlags::read_only()),
            merged(2, "Dup", Some(1), 0, CrudFlags::read_only()),
            merged(3, "Dup", None, 1, CrudFlags::ALL),
        ]);

        assert!(authorize(&tree, "Dup", Action::Read));
        assert!(!authorize(&tree, "Dup", Action::Delete));
        assert_eq!(find_resource(&tree, "Dup").unwrap().id, rid(2));
    }

    #[test]
    fn node_checked_before_its_children() {
        let tree = build_permission_tree(&[
            merged(1, "Same", None, 0, CrudFlags::NONE),
            merged(2, "Same", Some(1), 0, CrudFlags::ALL),
        ]);
        assert_eq!(find_resource(&tree, "Same").unwrap().id, rid(1));
        assert!(!authorize(&tree, "Same", Action::Read));
    }

    #[test]
    fn sibling_order_follows_display_order() {
        let tree = build_permission_tree(&[
            merged(1, "Root", None, 0, CrudFlags::NONE),
            merged(2, "Dup", Some(1), 5, CrudFlags::NONE),
            merged(3, "Dup", Some(1), 1, CrudFlags::ALL),
        ]);
        assert_eq!(find_resource(&tree, "Dup").unwrap().id, rid(3));
    }

    #[test]
    fn forbidden_names_required_permission() {
        let err = AuthzError::Forbidden {
            resource: "Blog".to_string(),
            action: Action::Delete,
        };
        assert_eq!(err.to_string(), "forbidden: missing permission 'can_delete' on 'Blog'");
        assert_eq!(err.required(), ("Blog", Action::Delete));
    }

    #[test]
    fn explanation_distinguishes_missing_resource_from_missing_flag() {
        let tree = build_permission_tree(&[merged(1, "Blog", None, 0, CrudFlags::read_only())]);

        let missing = explain_authorization(&tree, "Tag", Action::Read);
        assert!(!missing.granted);
        assert_eq!(missing.denial_reason, Some(DenialKind::ResourceNotFound));

        let flag = explain_authorization(&tree, "Blog", Action::Update);
        assert!(!flag.granted);
        assert_eq!(flag.denial_reason, Some(DenialKind::MissingPermission));
        assert_eq!(flag.matched.unwrap().allowed_actions, vec![Action::Read]);

        let ok = explain_authorization(&tree, "Blog", Action::Read);
        assert!(ok.granted);
        assert!(ok.denial_reason.is_none());
    }
}
