//! Headless presentation tree.
//!
//! The workspace is rendered into a tree of role-tagged nodes, each with an
//! attribute bag and an ordered child list. It mirrors what a browser would
//! show: columns hold document slots, slots hold a header and a scrollable
//! body, bodies hold page slots. Every child-list change is appended to a
//! journal that the reconciliation observer drains.
//!
//! Removed nodes give their arena slot back for reuse. A [`NodeId`] carries
//! the generation of its slot, so a handle to a removed node keeps failing
//! with [`Error::NodeNotFound`] after the slot has been handed out again.

pub mod markup;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Raw arena index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generation of the arena slot this handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}.{}", self.index, self.generation)
        }
    }
}

/// What a node is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The workspace root
    Workspace,
    /// A column of document slots
    Column,
    /// A document slot (header + body)
    Document,
    /// Header region carrying document metadata
    Header,
    /// Scrollable body holding page slots
    Body,
    /// A page slot
    Page,
    /// Preview image inside a page slot
    Image,
    /// Merge affordance between two document slots
    Merge,
    /// Inline notice (e.g. lost connection)
    Notice,
}

impl Role {
    /// Element name used in markup.
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Workspace => "workspace",
            Role::Column => "column",
            Role::Document => "document",
            Role::Header => "header",
            Role::Body => "body",
            Role::Page => "page",
            Role::Image => "img",
            Role::Merge => "merge",
            Role::Notice => "notice",
        }
    }

    /// Look up a role by element name.
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        Some(match tag {
            b"workspace" => Role::Workspace,
            b"column" => Role::Column,
            b"document" => Role::Document,
            b"header" => Role::Header,
            b"body" => Role::Body,
            b"page" => Role::Page,
            b"img" => Role::Image,
            b"merge" => Role::Merge,
            b"notice" => Role::Notice,
            _ => return None,
        })
    }
}

/// One child-list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node whose children changed
    pub target: NodeId,
    /// Nodes inserted into `target`
    pub added: Vec<NodeId>,
    /// Nodes removed from `target`
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Node {
    role: Role,
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
    alive: bool,
}

/// Arena-backed tree with a mutation journal.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: NodeId,
    journal: Vec<MutationRecord>,
}

impl Tree {
    /// Create a tree holding only a workspace root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            journal: Vec::new(),
        };
        tree.root = tree.create(Role::Workspace);
        tree
    }

    /// The workspace root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached node, reusing the slot of a removed node if any.
    pub fn create(&mut self, role: Role) -> NodeId {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index];
            node.role = role;
            node.parent = None;
            node.alive = true;
            return NodeId {
                index,
                generation: node.generation,
            };
        }

        let index = self.nodes.len();
        self.nodes.push(Node {
            role,
            attrs: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            generation: 0,
            alive: true,
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Check if only the root is left.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Number of arena slots allocated, live or free.
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    /// Create a detached node with attributes.
    pub fn create_with<K, V, I>(&mut self, role: Role, attrs: I) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let id = self.create(role);
        self.nodes[id.index].attrs = attrs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index)
            .filter(|n| n.alive && n.generation == id.generation)
            .ok_or(Error::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index)
            .filter(|n| n.alive && n.generation == id.generation)
            .ok_or(Error::NodeNotFound(id))
    }

    /// Check if the node exists (attached or not).
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Check if the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Role of a node.
    pub fn role(&self, id: NodeId) -> Option<Role> {
        self.node(id).ok().map(|n| n.role)
    }

    /// Read an attribute.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node(id)
            .ok()
            .and_then(|n| n.attrs.get(key))
            .map(String::as_str)
    }

    /// All attributes of a node, sorted by name.
    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(id)
            .ok()
            .into_iter()
            .flat_map(|n| n.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Write an attribute. Attribute changes are not journaled.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.attrs.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Result<Option<String>> {
        Ok(self.node_mut(id)?.attrs.remove(key))
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Children of a node (empty for unknown nodes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Children with a given role, in order.
    pub fn children_with_role(&self, id: NodeId, role: Role) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.role(c) == Some(role))
            .collect()
    }

    /// First child with a given role.
    pub fn first_child_with_role(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.role(c) == Some(role))
    }

    /// Descendants with a given role in document order (excluding `id`).
    pub fn descendants_with_role(&self, id: NodeId, role: Role) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.role(node) == Some(role) {
                found.push(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        found
    }

    /// Position of a node among its siblings.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Sibling immediately before `id`.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index
            .checked_sub(1)
            .map(|i| self.children(parent)[i])
    }

    /// Sibling immediately after `id`.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Insert `child` into `parent` at `index` (clamped), moving it if it is
    /// attached elsewhere.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(Error::InvalidMove("the workspace root cannot be moved".into()));
        }
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(Error::InvalidMove(format!(
                    "{} cannot be placed inside itself",
                    child
                )));
            }
            ancestor = self.parent(a);
        }

        self.detach(child)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let at = index.min(siblings.len());
        siblings.insert(at, child);
        self.node_mut(child)?.parent = Some(parent);
        self.journal.push(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, 0, child)
    }

    /// Insert `node` right after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or_else(|| {
            Error::InvalidMove(format!("{} has no parent to insert into", reference))
        })?;
        // Index is taken after any detach of `node` from the same parent.
        self.detach(node)?;
        let index = self.index_of(reference).map_or(usize::MAX, |i| i + 1);
        self.insert_child(parent, index, node)
    }

    /// Detach a node from its parent, keeping it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        self.journal.push(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        Ok(())
    }

    /// Remove a node and its whole subtree. Their slots become free.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(Error::InvalidMove("the workspace root cannot be removed".into()));
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let n = &mut self.nodes[node.index];
            if !n.alive || n.generation != node.generation {
                continue;
            }
            n.alive = false;
            n.generation = n.generation.wrapping_add(1);
            n.attrs.clear();
            stack.append(&mut n.children);
            self.free.push(node.index);
        }
        Ok(())
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Drain the mutation journal.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    /// Number of journaled records not yet drained.
    pub fn pending_records(&self) -> usize {
        self.journal.len()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
