//! Permission merger: OR-reduce grants across every role an identity holds.
//!
//! A user with several roles receives the union of what those roles confer.
//! Flags are combined with logical OR per resource id; never AND, never
//! last-write-wins. Distinct resource ids are never merged, even when their
//! names coincide.

use std::collections::HashMap;

use serde::Serialize;

use menugate_core::ResourceId;

use crate::grant::ResourceGrant;
use crate::permissions::{Action, CrudFlags};
use crate::resource::{ResourceNode, TreeItem};

/// Effective permission of one identity on one resource. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MergedGrant {
    pub resource: ResourceNode,
    pub flags: CrudFlags,
}

impl MergedGrant {
    pub fn id(&self) -> ResourceId {
        self.resource.id
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn allows(&self, action: Action) -> bool {
        self.flags.allows(action)
    }
}

impl TreeItem for MergedGrant {
    fn tree_id(&self) -> ResourceId {
        self.resource.id
    }

    fn tree_parent(&self) -> Option<ResourceId> {
        self.resource.parent_id
    }

    fn tree_order(&self) -> i32 {
        self.resource.order
    }
}

/// Merge per-role grant records into one entry per resource id.
///
/// Output order is the order in which each resource id first appears. The
/// resource metadata of that first record is kept.
pub fn merge_permissions(records: &[ResourceGrant]) -> Vec<MergedGrant> {
    let mut index: HashMap<ResourceId, usize> = HashMap::with_capacity(records.len());
    let mut merged: Vec<MergedGrant> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(&record.resource.id) {
            Some(&at) => {
                let existing = &merged[at];
                merged[at] = MergedGrant {
                    resource: existing.resource.clone(),
                    flags: existing.flags.union(record.flags),
                };
            }
            None => {
                index.insert(record.resource.id, merged.len());
                merged.push(MergedGrant {
                    resource: record.resource.clone(),
                    flags: record.flags,
                });
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use menugate_core::RoleId;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn resource(n: u128, name: &str) -> ResourceNode {
        ResourceNode::new(name, format!("/{name}")).with_id(ResourceId::from_uuid(Uuid::from_u128(n)))
    }

    fn record(role: RoleId, res: &ResourceNode, flags: CrudFlags) -> ResourceGrant {
        ResourceGrant {
            role_id: role,
            resource: res.clone(),
            flags,
        }
    }

    #[test]
    fn conflicting_roles_merge_to_union() {
        let blog = resource(1, "Blog");
        let a = RoleId::new();
        let b = RoleId::new();

        let merged = merge_permissions(&[
            record(a, &blog, CrudFlags::new(false, false, false, true)),
            record(b, &blog, CrudFlags::new(false, true, false, false)),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].flags, CrudFlags::new(false, true, false, true));
    }

    #[test]
    fn later_false_never_clears_earlier_true() {
        let blog = resource(1, "Blog");
        let role = RoleId::new();
        let merged = merge_permissions(&[
            record(role, &blog, CrudFlags::ALL),
            record(RoleId::new(), &blog, CrudFlags::NONE),
        ]);
        assert_eq!(merged[0].flags, CrudFlags::ALL);
    }

    #[test]
    fn same_name_different_ids_stay_separate() {
        let first = resource(1, "Blog");
        let second = resource(2, "Blog");
        let role = RoleId::new();

        let merged = merge_permissions(&[
            record(role, &first, CrudFlags::read_only()),
            record(role, &second, CrudFlags::ALL),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id(), first.id);
        assert_eq!(merged[1].id(), second.id);
        assert_eq!(merged[0].flags, CrudFlags::read_only());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(merge_permissions(&[]).is_empty());
    }

    fn flags() -> impl Strategy<Value = CrudFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(c, r, u, d)| CrudFlags::new(c, r, u, d))
    }

    proptest! {
        #[test]
        fn each_flag_is_or_across_roles(grants in prop::collection::vec((0u128..5, flags()), 0..30)) {
            let resources: Vec<ResourceNode> = (0..5).map(|n| resource(n, &format!("r{n}"))).collect();
            let records: Vec<ResourceGrant> = grants
                .iter()
                .map(|(r, f)| record(RoleId::new(), &resources[*r as usize], *f))
                .collect();

            let merged = merge_permissions(&records);

            for m in &merged {
                for action in Action::ALL {
                    let expected = records
                        .iter()
                        .filter(|g| g.resource.id == m.id())
                        .any(|g| g.flags.allows(action));
                    prop_assert_eq!(m.allows(action), expected);
                }
            }

            let distinct: std::collections::HashSet<_> = records.iter().map(|g| g.resource.id).collect();
            prop_assert_eq!(merged.len(), distinct.len());
        }
    }
}
