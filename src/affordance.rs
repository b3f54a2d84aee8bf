//! Merge affordances between adjacent document slots.
//!
//! An affordance is only meaningful while it sits directly between two
//! document slots of the same column. Reconciliation throws all of them
//! away and recreates them, so a dismissed affordance comes back after the
//! next structural change.

use crate::error::{Error, Result};
use crate::schema;
use crate::tree::{NodeId, Role, Tree};

/// Remove every affordance in the workspace. Returns how many were removed.
pub fn clear_all(tree: &mut Tree) -> Result<usize> {
    let stale = tree.descendants_with_role(tree.root(), Role::Merge);
    for &node in &stale {
        tree.remove(node)?;
    }
    Ok(stale.len())
}

/// Insert one affordance between each consecutive pair of document slots in
/// `column`. Returns how many were inserted.
pub fn insert_between_slots(tree: &mut Tree, column: NodeId) -> Result<usize> {
    let slots = tree.children_with_role(column, Role::Document);
    if slots.len() < 2 {
        return Ok(0);
    }
    for &slot in &slots[..slots.len() - 1] {
        let affordance = tree.create(Role::Merge);
        tree.insert_after(slot, affordance)?;
    }
    Ok(slots.len() - 1)
}

/// The two slots flanking an affordance, if it is still valid.
pub fn flanking_slots(tree: &Tree, affordance: NodeId) -> Option<(NodeId, NodeId)> {
    if tree.role(affordance) != Some(Role::Merge) {
        return None;
    }
    let before = tree.previous_sibling(affordance)?;
    let after = tree.next_sibling(affordance)?;
    let is_slot = |n: NodeId| tree.role(n) == Some(Role::Document);
    (is_slot(before) && is_slot(after)).then_some((before, after))
}

/// Merge the slot after `affordance` into the slot before it.
///
/// The following slot's page slots are appended, in order, to the end of
/// the preceding slot's body; then the following slot and the affordance
/// are removed. The preceding slot keeps its own metadata. Returns the
/// surviving slot.
pub fn merge(tree: &mut Tree, affordance: NodeId) -> Result<NodeId> {
    let (target, source) =
        flanking_slots(tree, affordance).ok_or(Error::StaleAffordance(affordance))?;

    let target_body = match tree.first_child_with_role(target, Role::Body) {
        Some(body) => body,
        None => {
            let body = tree.create(Role::Body);
            tree.append_child(target, body)?;
            body
        }
    };

    let moved = tree
        .first_child_with_role(source, Role::Body)
        .map(|body| tree.children_with_role(body, Role::Page))
        .unwrap_or_default();
    for &page in &moved {
        tree.append_child(target_body, page)?;
    }

    let total = tree.children_with_role(target_body, Role::Page).len();
    tree.set_attr(target, schema::PAGE_COUNT, total.to_string())?;

    tree.remove(source)?;
    tree.remove(affordance)?;
    log::debug!(
        "merged {} pages from {:?} into {:?}",
        moved.len(),
        tree.attr(target, schema::ID),
        target
    );
    Ok(target)
}

/// Hide an affordance without touching the slots around it.
pub fn dismiss(tree: &mut Tree, affordance: NodeId) -> Result<()> {
    if tree.role(affordance) != Some(Role::Merge) {
        return Err(Error::StaleAffordance(affordance));
    }
    tree.set_attr(affordance, schema::HIDDEN, "true")
}
