//! Reconciliation observer.
//!
//! The observer watches the workspace root and every column for child-list
//! changes. A batch of such changes starts a reconciliation pass, which
//! normalizes the columns, rebuilds merge affordances, re-binds reordering
//! and finally re-arms observation. The pass disarms first: its own edits
//! would otherwise be observed and start another pass.

use crate::affordance;
use crate::error::Result;
use crate::materialize::ColumnIds;
use crate::options::WorkspaceOptions;
use crate::reorder::ReorderBinder;
use crate::schema;
use crate::tree::{MutationRecord, NodeId, Role, Tree};
use std::collections::HashSet;

/// Observer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    /// Watching for mutations
    Armed,
    /// Not watching; a reconciliation pass owns the tree
    Reconciling,
}

/// Child-list changes delivered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    /// Records in the order they happened
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Watches the workspace root and its columns.
#[derive(Debug, Clone)]
pub struct Observer {
    state: ObserverState,
    observed: HashSet<NodeId>,
}

impl Observer {
    /// Create an observer. It stays disarmed until [`arm`](Self::arm).
    pub fn new() -> Self {
        Self {
            state: ObserverState::Reconciling,
            observed: HashSet::new(),
        }
    }

    /// Start watching the root and every column currently in the tree.
    pub fn arm(&mut self, tree: &Tree) {
        self.observed.clear();
        self.observed.insert(tree.root());
        self.observed
            .extend(tree.children_with_role(tree.root(), Role::Column));
        self.state = ObserverState::Armed;
    }

    /// Stop watching.
    pub fn disarm(&mut self) {
        self.observed.clear();
        self.state = ObserverState::Reconciling;
    }

    /// Check if mutations are currently observed.
    pub fn is_armed(&self) -> bool {
        self.state == ObserverState::Armed
    }

    /// Current state.
    pub fn state(&self) -> ObserverState {
        self.state
    }

    /// Check if a node is observed.
    pub fn observes(&self, node: NodeId) -> bool {
        self.observed.contains(&node)
    }

    /// Keep the records that target an observed node.
    ///
    /// Returns `None` when disarmed or when nothing relevant changed.
    pub fn filter(&self, records: Vec<MutationRecord>) -> Option<MutationBatch> {
        if !self.is_armed() {
            return None;
        }
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| self.observes(r.target))
            .collect();
        (!records.is_empty()).then_some(MutationBatch { records })
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Empty non-trailing columns removed
    pub columns_removed: usize,
    /// Whether a trailing placeholder column was added
    pub placeholder_added: bool,
    /// Merge affordances removed
    pub affordances_removed: usize,
    /// Merge affordances inserted
    pub affordances_inserted: usize,
}

impl ReconcileReport {
    /// Check if the pass only recreated affordances in place.
    pub fn is_noop(&self) -> bool {
        self.columns_removed == 0
            && !self.placeholder_added
            && self.affordances_removed == self.affordances_inserted
    }
}

/// Everything a reconciliation pass works on.
pub(crate) struct Reconciler<'a> {
    /// Tree being normalized
    pub tree: &'a mut Tree,
    /// Observer disarmed for the pass and re-armed after it
    pub observer: &'a mut Observer,
    /// Binder re-run once the tree is normalized
    pub binder: &'a mut ReorderBinder,
    /// Id source for placeholder columns
    pub column_ids: &'a mut ColumnIds,
    /// Affordance settings
    pub options: &'a WorkspaceOptions,
}

impl Reconciler<'_> {
    /// Run one pass. Observation is re-armed even when a step fails.
    pub fn run(self) -> Result<ReconcileReport> {
        self.observer.disarm();

        let result = normalize(self.tree, self.column_ids, self.options);
        self.binder.bind(self.tree);

        // The pass's own edits are not delivered.
        let discarded = self.tree.take_records();
        self.observer.arm(self.tree);

        if let Ok(report) = &result {
            log::debug!(
                "reconciled: -{} columns, placeholder {}, merges -{}/+{} ({} own records dropped)",
                report.columns_removed,
                report.placeholder_added,
                report.affordances_removed,
                report.affordances_inserted,
                discarded.len()
            );
        }
        result
    }
}

fn normalize(
    tree: &mut Tree,
    column_ids: &mut ColumnIds,
    options: &WorkspaceOptions,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let root = tree.root();

    let columns = tree.children_with_role(root, Role::Column);
    if let Some((_, leading)) = columns.split_last() {
        for &column in leading {
            if is_empty_column(tree, column) {
                tree.remove(column)?;
                report.columns_removed += 1;
            }
        }
    }

    match columns.last() {
        Some(&last) if is_empty_column(tree, last) => {}
        Some(&last) => {
            let placeholder = new_column(tree, column_ids);
            tree.insert_after(last, placeholder)?;
            report.placeholder_added = true;
        }
        None => {
            let placeholder = new_column(tree, column_ids);
            tree.append_child(root, placeholder)?;
            report.placeholder_added = true;
        }
    }

    report.affordances_removed = affordance::clear_all(tree)?;

    if options.merge_affordances {
        for column in tree.children_with_role(root, Role::Column) {
            report.affordances_inserted += affordance::insert_between_slots(tree, column)?;
        }
    }

    Ok(report)
}

/// A column counts as empty when it holds no document slot.
fn is_empty_column(tree: &Tree, column: NodeId) -> bool {
    tree.first_child_with_role(column, Role::Document).is_none()
}

fn new_column(tree: &mut Tree, column_ids: &mut ColumnIds) -> NodeId {
    let id = column_ids.next_id(tree);
    tree.create_with(Role::Column, [(schema::ID, id)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::markup::{parse_fragment, render_children};

    struct Fixture {
        tree: Tree,
        observer: Observer,
        binder: ReorderBinder,
        ids: ColumnIds,
        options: WorkspaceOptions,
    }

    impl Fixture {
        fn new(markup: &str) -> Self {
            let mut tree = Tree::new();
            let root = tree.root();
            for node in parse_fragment(&mut tree, markup).unwrap() {
                tree.append_child(root, node).unwrap();
            }
            tree.take_records();
            Self {
                tree,
                observer: Observer::new(),
                binder: ReorderBinder::new(),
                ids: ColumnIds::new("column"),
                options: WorkspaceOptions::default(),
            }
        }

        fn reconcile(&mut self) -> ReconcileReport {
            Reconciler {
                tree: &mut self.tree,
                observer: &mut self.observer,
                binder: &mut self.binder,
                column_ids: &mut self.ids,
                options: &self.options,
            }
            .run()
            .unwrap()
        }

        fn markup(&self) -> String {
            render_children(&self.tree, self.tree.root())
        }
    }

    #[test]
    fn test_empty_workspace_gets_placeholder() {
        let mut f = Fixture::new("");
        let report = f.reconcile();
        assert!(report.placeholder_added);
        assert_eq!(f.markup(), r#"<column id="column-1"/>"#);
        assert!(f.observer.is_armed());
    }

    #[test]
    fn test_removes_empty_leading_columns_and_adds_trailing() {
        let mut f = Fixture::new(
            r#"<column id="a"/><column id="b"><document id="d1"/></column><column id="c"/><column id="d"><document id="d2"/></column>"#,
        );
        let report = f.reconcile();
        assert_eq!(report.columns_removed, 2);
        assert!(report.placeholder_added);
        assert_eq!(
            f.markup(),
            r#"<column id="b"><document id="d1"/></column><column id="d"><document id="d2"/></column><column id="column-1"/>"#
        );
    }

    #[test]
    fn test_keeps_single_trailing_empty_column() {
        let mut f = Fixture::new(r#"<column id="b"><document id="d1"/></column><column id="z"/>"#);
        let report = f.reconcile();
        assert!(!report.placeholder_added);
        assert_eq!(report.columns_removed, 0);
    }

    #[test]
    fn test_placeholder_goes_before_notices() {
        let mut f = Fixture::new(
            r#"<column id="b"><document id="d1"/></column><notice kind="transport" message="lost"/>"#,
        );
        f.reconcile();
        assert_eq!(
            f.markup(),
            r#"<column id="b"><document id="d1"/></column><column id="column-1"/><notice kind="transport" message="lost"/>"#
        );
    }

    #[test]
    fn test_affordances_rebuilt() {
        let mut f = Fixture::new(
            r#"<column id="a"><document id="1"/><merge/><merge/><document id="2"/><document id="3"/></column><column id="b"/>"#,
        );
        let report = f.reconcile();
        assert_eq!(report.affordances_removed, 2);
        assert_eq!(report.affordances_inserted, 2);
        assert_eq!(
            f.markup(),
            r#"<column id="a"><document id="1"/><merge/><document id="2"/><merge/><document id="3"/></column><column id="b"/>"#
        );
    }

    #[test]
    fn test_stale_affordance_does_not_keep_column_alive() {
        let mut f = Fixture::new(
            r#"<column id="a"><merge/></column><column id="b"><document id="1"/></column><column id="c"/>"#,
        );
        f.reconcile();
        assert_eq!(
            f.markup(),
            r#"<column id="b"><document id="1"/></column><column id="c"/>"#
        );
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut f = Fixture::new(
            r#"<column id="a"/><column id="b"><document id="1"/><document id="2"/></column>"#,
        );
        f.reconcile();
        let first = f.markup();
        let report = f.reconcile();
        assert!(report.is_noop());
        assert_eq!(f.markup(), first);
    }

    #[test]
    fn test_merge_affordances_can_be_disabled() {
        let mut f = Fixture::new(r#"<column id="a"><document id="1"/><document id="2"/></column>"#);
        f.options = WorkspaceOptions::new().with_merge_affordances(false);
        let report = f.reconcile();
        assert_eq!(report.affordances_inserted, 0);
    }

    #[test]
    fn test_observer_filters_records() {
        let mut f = Fixture::new(r#"<column id="a"><document id="1"><body/></document></column>"#);
        f.reconcile();
        let root = f.tree.root();
        let column = f.tree.children_with_role(root, Role::Column)[0];
        let body = f.tree.descendants_with_role(root, Role::Body)[0];

        let page = f.tree.create(Role::Page);
        f.tree.append_child(body, page).unwrap();
        assert!(f.observer.filter(f.tree.take_records()).is_none());

        let slot = f.tree.create(Role::Document);
        f.tree.append_child(column, slot).unwrap();
        let batch = f.observer.filter(f.tree.take_records()).unwrap();
        assert_eq!(batch.len(), 1);

        f.observer.disarm();
        let other = f.tree.create(Role::Column);
        f.tree.append_child(root, other).unwrap();
        assert!(f.observer.filter(f.tree.take_records()).is_none());
    }

    #[test]
    fn test_repeated_passes_reuse_arena_slots() {
        let mut f = Fixture::new(
            r#"<column id="a"><document id="1"/><document id="2"/><document id="3"/></column>"#,
        );
        f.reconcile();
        let slots = f.tree.slots();
        let live = f.tree.len();

        for _ in 0..10_000 {
            f.reconcile();
        }
        assert_eq!(f.tree.slots(), slots);
        assert_eq!(f.tree.len(), live);

        let next = f.tree.create(Role::Merge);
        assert!(next.index() <= slots);
    }

    #[test]
    fn test_pass_leaves_no_pending_records() {
        let mut f = Fixture::new(r#"<column id="a"><document id="1"/><document id="2"/></column>"#);
        f.reconcile();
        assert_eq!(f.tree.pending_records(), 0);
        assert_eq!(f.observer.state(), ObserverState::Armed);
        assert!(f.binder.passes() >= 1);
    }
}
