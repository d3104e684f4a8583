//! Resource nodes ("menus") and the tree builder.
//!
//! Resources arrive from storage as a flat list with parent references. The
//! builder turns them into an ordered forest:
//!
//! - roots are nodes without a parent, or whose parent id does not resolve
//! - children are sorted ascending by `order`, ties broken by id
//! - nodes stuck in a parent cycle are promoted to roots instead of dropped
//!
//! The builder is pure and deterministic: it only reads its input and returns
//! the same tree for the same multiset of records, whatever their input order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use menugate_core::{DomainError, ResourceId};

/// An addressable administrative capability, arranged in a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: ResourceId,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ResourceId>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub hidden: bool,
}

impl ResourceNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            name: name.into(),
            path: path.into(),
            icon: None,
            parent_id: None,
            order: 0,
            hidden: false,
        }
    }

    pub fn with_id(mut self, id: ResourceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_parent(mut self, parent_id: ResourceId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("resource name cannot be empty"));
        }
        if self.name.chars().count() > 50 {
            return Err(DomainError::validation("resource name longer than 50 characters"));
        }
        if self.path.trim().is_empty() {
            return Err(DomainError::validation("resource path cannot be empty"));
        }
        if self.parent_id == Some(self.id) {
            return Err(DomainError::invariant("resource cannot be its own parent"));
        }
        Ok(())
    }
}

/// Something that can be placed in the resource forest.
pub trait TreeItem {
    fn tree_id(&self) -> ResourceId;
    fn tree_parent(&self) -> Option<ResourceId>;
    fn tree_order(&self) -> i32;
}

impl TreeItem for ResourceNode {
    fn tree_id(&self) -> ResourceId {
        self.id
    }

    fn tree_parent(&self) -> Option<ResourceId> {
        self.parent_id
    }

    fn tree_order(&self) -> i32 {
        self.order
    }
}

/// A node of the built forest. Serializes as the item's fields plus `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Build the resource forest from flat records.
pub fn build_resource_tree(nodes: &[ResourceNode]) -> Vec<TreeNode<ResourceNode>> {
    build_tree(nodes)
}

/// Generic forest builder used for both resources and merged grants.
pub fn build_tree<T>(items: &[T]) -> Vec<TreeNode<T>>
where
    T: TreeItem + Ord + Clone,
{
    let mut sorted: Vec<usize> = (0..items.len()).collect();
    sorted.sort_by(|&a, &b| sibling_order(&items[a], &items[b]));

    let known: HashSet<ResourceId> = items.iter().map(TreeItem::tree_id).collect();

    let mut children: HashMap<ResourceId, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    for &idx in &sorted {
        match items[idx].tree_parent() {
            Some(parent) if known.contains(&parent) => children.entry(parent).or_default().push(idx),
            _ => roots.push(idx),
        }
    }

    let mut builder = Builder {
        items,
        children: &children,
        visited: vec![false; items.len()],
    };

    let mut forest: Vec<TreeNode<T>> = roots.into_iter().map(|idx| builder.build(idx)).collect();

    // Anything not reached hangs off a parent cycle.
    for idx in sorted {
        if !builder.visited[idx] {
            tracing::warn!(
                resource_id = %items[idx].tree_id(),
                "resource unreachable from any root (parent cycle); promoting to root"
            );
            forest.push(builder.build(idx));
        }
    }

    forest
}

fn sibling_order<T: TreeItem + Ord>(a: &T, b: &T) -> Ordering {
    a.tree_order()
        .cmp(&b.tree_order())
        .then_with(|| a.tree_id().cmp(&b.tree_id()))
        .then_with(|| a.cmp(b))
}

struct Builder<'a, T> {
    items: &'a [T],
    children: &'a HashMap<ResourceId, Vec<usize>>,
    visited: Vec<bool>,
}

impl<T: TreeItem + Clone> Builder<'_, T> {
    fn build(&mut self, idx: usize) -> TreeNode<T> {
        self.visited[idx] = true;
        let items = self.items;
        let children = self.children;
        let item = &items[idx];

        let mut kids = Vec::new();
        if let Some(child_idxs) = children.get(&item.tree_id()) {
            for &child in child_idxs {
                if !self.visited[child] {
                    kids.push(self.build(child));
                }
            }
        }

        TreeNode {
            item: item.clone(),
            children: kids,
        }
    }
}

/// Pre-order flattening of a forest.
pub fn flatten_tree<T: Clone>(forest: &[TreeNode<T>]) -> Vec<T> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.item.clone());
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Would re-parenting `id` under `new_parent` close a cycle?
pub fn would_create_cycle(nodes: &[ResourceNode], id: ResourceId, new_parent: ResourceId) -> bool {
    if id == new_parent {
        return true;
    }

    let parents: HashMap<ResourceId, Option<ResourceId>> =
        nodes.iter().map(|n| (n.id, n.parent_id)).collect();

    let mut current = Some(new_parent);
    let mut steps = 0usize;
    while let Some(cur) = current {
        if cur == id {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            // Pre-existing cycle that does not involve `id`.
            return false;
        }
        current = parents.get(&cur).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn rid(n: u128) -> ResourceId {
        ResourceId::from_uuid(Uuid::from_u128(n))
    }

    fn node(n: u128, parent: Option<u128>, order: i32) -> ResourceNode {
        let mut node = ResourceNode::new(format!("node-{n}"), format!("/n/{n}"))
            .with_id(rid(n))
            .with_order(order);
        node.parent_id = parent.map(rid);
        node
    }

    fn names(forest: &[TreeNode<ResourceNode>]) -> Vec<String> {
        forest.iter().map(|n| n.item.name.clone()).collect()
    }

    #[test]
    fn children_sorted_by_order_then_id() {
        let input = vec![
            node(1, None, 0),
            node(4, Some(1), 2),
            node(3, Some(1), 1),
            node(2, Some(1), 1),
        ];
        let forest = build_resource_tree(&input);
        assert_eq!(forest.len(), 1);
        assert_eq!(names(&forest[0].children), vec!["node-2", "node-3", "node-4"]);
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let input = vec![node(1, None, 5), node(2, Some(999), 0)];
        let forest = build_resource_tree(&input);
        assert_eq!(names(&forest), vec!["node-2", "node-1"]);
    }

    #[test]
    fn input_is_not_mutated_and_output_is_order_independent() {
        let input = vec![node(1, None, 0), node(2, Some(1), 0), node(3, None, -1)];
        let snapshot = input.clone();
        let forward = build_resource_tree(&input);

        let mut reversed = input.clone();
        reversed.reverse();
        let backward = build_resource_tree(&reversed);

        assert_eq!(input, snapshot);
        assert_eq!(forward, backward);
    }

    #[test]
    fn parent_cycle_is_promoted_not_dropped() {
        let input = vec![node(1, Some(2), 0), node(2, Some(1), 0), node(3, None, 0)];
        let forest = build_resource_tree(&input);
        let total: usize = forest.iter().map(TreeNode::len).sum();
        assert_eq!(total, 3);
        assert_eq!(forest[0].item.id, rid(3));
    }

    #[test]
    fn self_parent_is_kept() {
        let input = vec![node(7, Some(7), 0)];
        let forest = build_resource_tree(&input);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].is_leaf());
    }

    #[test]
    fn cycle_detection_walks_parent_chain() {
        let input = vec![node(1, None, 0), node(2, Some(1), 0), node(3, Some(2), 0)];
        assert!(would_create_cycle(&input, rid(1), rid(3)));
        assert!(!would_create_cycle(&input, rid(3), rid(1)));
        assert!(would_create_cycle(&input, rid(2), rid(2)));
    }

    #[test]
    fn serializes_with_children_inline() {
        let forest = build_resource_tree(&[node(1, None, 0), node(2, Some(1), 0)]);
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["name"], "node-1");
        assert_eq!(json[0]["children"][0]["name"], "node-2");
        assert!(json[0]["children"][0]["children"].as_array().unwrap().is_empty());
    }

    /// Acyclic input: each node's parent is either absent, dangling, or a lower id.
    fn acyclic_nodes() -> impl Strategy<Value = Vec<ResourceNode>> {
        prop::collection::vec((0u8..4, -3i32..3), 1..40).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (kind, order))| {
                    let id = i as u128 + 1;
                    let parent = match kind {
                        0 => None,
                        1 => Some(10_000 + id),
                        _ if id > 1 => Some(1 + (id * 7919) % (id - 1)),
                        _ => None,
                    };
                    node(id, parent, order)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn round_trip_preserves_nodes_and_edges(input in acyclic_nodes()) {
            let forest = build_resource_tree(&input);
            let flat = flatten_tree(&forest);
            prop_assert_eq!(flat.len(), input.len());

            let known: HashSet<ResourceId> = input.iter().map(|n| n.id).collect();
            for root in &forest {
                prop_assert!(root.item.parent_id.map_or(true, |p| !known.contains(&p)));
            }

            fn check(node: &TreeNode<ResourceNode>) -> Result<(), TestCaseError> {
                for pair in node.children.windows(2) {
                    prop_assert!(pair[0].item.order <= pair[1].item.order);
                }
                for child in &node.children {
                    prop_assert_eq!(child.item.parent_id, Some(node.item.id));
                    check(child)?;
                }
                Ok(())
            }
            for root in &forest {
                check(root)?;
            }
        }

        #[test]
        fn shuffled_input_builds_identical_tree(input in acyclic_nodes(), seed in any::<u64>()) {
            let mut shuffled = input.clone();
            let len = shuffled.len();
            for i in (1..len).rev() {
                let j = ((seed ^ (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)) % (i as u64 + 1)) as usize;
                shuffled.swap(i, j);
            }
            prop_assert_eq!(build_resource_tree(&input), build_resource_tree(&shuffled));
        }
    }
}
