//! Reorder capability binding.
//!
//! The drag-reordering primitive itself is external; what this module keeps
//! is which containers currently accept drags and in which group. Page slots
//! move between any two bodies, document slots between any two columns.

use crate::error::{Error, Result};
use crate::tree::{NodeId, Role, Tree};
use std::collections::HashMap;

/// A set of containers whose children may move between each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReorderGroup {
    /// Page slots inside document bodies
    Pages,
    /// Document slots inside columns
    Documents,
}

impl ReorderGroup {
    /// Role of the containers in this group.
    pub fn container_role(&self) -> Role {
        match self {
            ReorderGroup::Pages => Role::Body,
            ReorderGroup::Documents => Role::Column,
        }
    }

    /// Role of the items that move within this group.
    pub fn item_role(&self) -> Role {
        match self {
            ReorderGroup::Pages => Role::Page,
            ReorderGroup::Documents => Role::Document,
        }
    }
}

/// Tracks which containers support interactive reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderBinder {
    bindings: HashMap<NodeId, ReorderGroup>,
    passes: u64,
}

impl ReorderBinder {
    /// Create a binder with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every body and every column attached to the workspace.
    ///
    /// Bindings for containers that left the tree are dropped, so calling
    /// this any number of times leaves the same final state.
    pub fn bind(&mut self, tree: &Tree) {
        self.bindings.clear();
        for group in [ReorderGroup::Pages, ReorderGroup::Documents] {
            for container in tree.descendants_with_role(tree.root(), group.container_role()) {
                self.bindings.insert(container, group);
            }
        }
        self.passes += 1;
        log::trace!(
            "reorder bind pass {}: {} containers",
            self.passes,
            self.bindings.len()
        );
    }

    /// Group a container is bound to, if any.
    pub fn group_of(&self, container: NodeId) -> Option<ReorderGroup> {
        self.bindings.get(&container).copied()
    }

    /// Check if a container accepts drags.
    pub fn is_bound(&self, container: NodeId) -> bool {
        self.bindings.contains_key(&container)
    }

    /// Number of bound containers.
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of bind passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Validate moving `item` into `target`. Returns the group of the move.
    pub fn check(&self, tree: &Tree, item: NodeId, target: NodeId) -> Result<ReorderGroup> {
        let source = tree.parent(item).ok_or(Error::NodeNotFound(item))?;
        let from = self.group_of(source).ok_or(Error::NotReorderable(source))?;
        let to = self.group_of(target).ok_or(Error::NotReorderable(target))?;
        if from != to || tree.role(item) != Some(from.item_role()) {
            return Err(Error::NotReorderable(target));
        }
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_columns() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root();
        let c1 = tree.create(Role::Column);
        let c2 = tree.create(Role::Column);
        let doc = tree.create(Role::Document);
        let body = tree.create(Role::Body);
        tree.append_child(root, c1).unwrap();
        tree.append_child(root, c2).unwrap();
        tree.append_child(c1, doc).unwrap();
        tree.append_child(doc, body).unwrap();
        (tree, c1, c2, doc, body)
    }

    #[test]
    fn test_bind_is_idempotent() {
        let (tree, c1, _, _, body) = two_columns();
        let mut binder = ReorderBinder::new();
        binder.bind(&tree);
        binder.bind(&tree);
        assert_eq!(binder.bound_count(), 3);
        assert_eq!(binder.group_of(c1), Some(ReorderGroup::Documents));
        assert_eq!(binder.group_of(body), Some(ReorderGroup::Pages));
        assert_eq!(binder.passes(), 2);
    }

    #[test]
    fn test_bind_drops_removed_containers() {
        let (mut tree, _, c2, _, _) = two_columns();
        let mut binder = ReorderBinder::new();
        binder.bind(&tree);
        tree.remove(c2).unwrap();
        binder.bind(&tree);
        assert!(!binder.is_bound(c2));
    }

    #[test]
    fn test_check_groups() {
        let (tree, _, c2, doc, body) = two_columns();
        let mut binder = ReorderBinder::new();
        binder.bind(&tree);
        assert_eq!(binder.check(&tree, doc, c2).unwrap(), ReorderGroup::Documents);
        assert!(matches!(
            binder.check(&tree, doc, body),
            Err(Error::NotReorderable(_))
        ));
    }
}
