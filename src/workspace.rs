//! The workspace: presentation tree, observer, reorder binder and the event
//! queue that drives them.
//!
//! All work happens on the thread that owns the [`Workspace`]. Other threads
//! (an HTTP reader, for instance) only ever hold a [`Sender`] and post
//! [`Event`]s; [`Workspace::dispatch`] handles one event to completion
//! before the next is taken off the queue.
//!
//! # Example
//!
//! ```
//! use pagefold::{Document, DocumentSet, Page, Workspace};
//!
//! fn main() -> pagefold::Result<()> {
//!     let mut doc = Document::default();
//!     doc.add_page(Page::new("p1", 1).with_preview("/a.png"));
//!     let mut set = DocumentSet::new();
//!     set.insert("abcdefghijklmno_report.pdf", doc);
//!
//!     let mut workspace = Workspace::new();
//!     workspace.materialize(&set)?;
//!     workspace.run_until_idle()?;
//!
//!     let snapshot = workspace.extract();
//!     assert_eq!(snapshot.document_count(), 1);
//!     Ok(())
//! }
//! ```

use crate::affordance;
use crate::error::{Error, Result};
use crate::extract::{debug_snapshot, extract};
use crate::materialize::{self, ColumnIds};
use crate::model::{normalize_rotation, parse_flag, Arrangement, DocumentSet, PageStatus};
use crate::observer::{MutationBatch, Observer, ReconcileReport, Reconciler};
use crate::options::WorkspaceOptions;
use crate::reorder::{ReorderBinder, ReorderGroup};
use crate::schema;
use crate::stream::{PayloadKind, StreamEvent};
use crate::tree::markup::{parse_fragment, render_children};
use crate::tree::{NodeId, Role, Tree};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashSet;
use std::time::Duration;

/// Something the workspace has to react to.
#[derive(Debug, Clone)]
pub enum Event {
    /// Child-list changes seen by the armed observer
    Mutations(MutationBatch),
    /// A drag inside a reorder group completed
    ReorderFinished {
        /// Group the drag happened in
        group: ReorderGroup,
    },
    /// Something arrived on the update stream
    Stream(StreamEvent),
}

/// Kind of inline notice shown at the end of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The update stream was lost
    Transport,
    /// A pushed payload could not be applied
    Payload,
}

impl NoticeKind {
    fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Transport => "transport",
            NoticeKind::Payload => "payload",
        }
    }
}

/// A page-arrangement workspace.
pub struct Workspace {
    tree: Tree,
    observer: Observer,
    binder: ReorderBinder,
    column_ids: ColumnIds,
    options: WorkspaceOptions,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    last_report: Option<ReconcileReport>,
    stream_finished: bool,
    pushed_files: HashSet<String>,
}

impl Workspace {
    /// Create an empty workspace with default options.
    pub fn new() -> Self {
        Self::with_options(WorkspaceOptions::default())
    }

    /// Create an empty workspace.
    ///
    /// The first reconciliation pass runs immediately, so the workspace
    /// starts with its trailing drop target and an armed observer.
    pub fn with_options(options: WorkspaceOptions) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut workspace = Self {
            tree: Tree::new(),
            observer: Observer::new(),
            binder: ReorderBinder::new(),
            column_ids: ColumnIds::new(options.column_prefix.clone()),
            options,
            sender,
            receiver,
            last_report: None,
            stream_finished: false,
            pushed_files: HashSet::new(),
        };
        if let Err(e) = workspace.reconcile() {
            log::warn!("initial reconciliation failed: {}", e);
        }
        workspace
    }

    /// Create a workspace from saved markup.
    pub fn from_markup(markup: &str, options: WorkspaceOptions) -> Result<Self> {
        let mut workspace = Self::with_options(options);
        workspace.append_markup(markup)?;
        workspace.run_until_idle()?;
        Ok(workspace)
    }

    /// The presentation tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Workspace options.
    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    /// The reconciliation observer.
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// The reorder binder.
    pub fn binder(&self) -> &ReorderBinder {
        &self.binder
    }

    /// Report of the most recent reconciliation pass.
    pub fn last_report(&self) -> Option<&ReconcileReport> {
        self.last_report.as_ref()
    }

    /// A producer handle for the event queue.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.receiver.len()
    }

    /// Check if the update stream has ended or failed.
    pub fn stream_finished(&self) -> bool {
        self.stream_finished
    }

    // ---- translation boundary -------------------------------------------

    /// Snapshot of the current arrangement.
    pub fn extract(&self) -> Arrangement {
        extract(&self.tree)
    }

    /// Pretty JSON of the current arrangement.
    pub fn debug_snapshot(&self) -> Result<String> {
        debug_snapshot(&self.tree)
    }

    /// Markup of everything in the workspace.
    pub fn to_markup(&self) -> String {
        render_children(&self.tree, self.tree.root())
    }

    /// Prepend one column per document and re-bind reordering.
    pub fn materialize(&mut self, documents: &DocumentSet) -> Result<Vec<NodeId>> {
        let columns = materialize::materialize(
            &mut self.tree,
            documents,
            &mut self.column_ids,
            self.options.id_prefix_len,
        )?;
        self.binder.bind(&self.tree);
        self.flush();
        Ok(columns)
    }

    /// Apply a full-state store push from the server.
    ///
    /// The server re-sends every uploaded file on each update, so only
    /// filenames not pushed before are materialized. Returns the new columns.
    pub fn apply_store(&mut self, store: &DocumentSet) -> Result<Vec<NodeId>> {
        let mut fresh = DocumentSet::new();
        for (filename, document) in store.iter() {
            if !self.pushed_files.contains(filename) {
                fresh.insert(filename, document.clone());
            }
        }
        if fresh.is_empty() {
            log::trace!("store push of {} files brought nothing new", store.len());
            return Ok(Vec::new());
        }

        let columns = self.materialize(&fresh)?;
        self.pushed_files
            .extend(fresh.iter().map(|(filename, _)| filename.to_string()));
        log::debug!("store push: {} new of {} files", fresh.len(), store.len());
        Ok(columns)
    }

    /// Append a markup fragment to the end of the workspace root.
    pub fn append_markup(&mut self, markup: &str) -> Result<Vec<NodeId>> {
        let nodes = parse_fragment(&mut self.tree, markup)?;
        let root = self.tree.root();
        for &node in &nodes {
            self.tree.append_child(root, node)?;
        }
        self.flush();
        Ok(nodes)
    }

    /// Run one reconciliation pass right away.
    pub fn reconcile(&mut self) -> Result<ReconcileReport> {
        let report = Reconciler {
            tree: &mut self.tree,
            observer: &mut self.observer,
            binder: &mut self.binder,
            column_ids: &mut self.column_ids,
            options: &self.options,
        }
        .run()?;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    // ---- event loop -------------------------------------------------------

    /// Queue an event.
    pub fn post(&self, event: Event) {
        // The workspace holds a receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(event);
    }

    /// Handle one event to completion.
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Mutations(batch) => {
                log::trace!("mutation batch of {} records", batch.len());
                self.reconcile()?;
            }
            Event::ReorderFinished { group } => {
                log::trace!("reorder finished in {:?}", group);
                self.reconcile()?;
            }
            Event::Stream(StreamEvent::Message(payload)) => self.apply_payload(&payload)?,
            Event::Stream(StreamEvent::Failed(reason)) => {
                self.stream_finished = true;
                let message = self.options.transport_notice.clone();
                self.notice(NoticeKind::Transport, &message, &reason)?;
            }
            Event::Stream(StreamEvent::Closed) => {
                self.stream_finished = true;
                log::info!("update stream closed");
            }
        }
        Ok(())
    }

    /// Handle every queued event, including those queued while handling.
    /// Returns how many events were handled.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Block on the queue until the update stream has ended, then drain it.
    pub fn run(&mut self) -> Result<()> {
        while !self.stream_finished {
            let event = self
                .receiver
                .recv()
                .map_err(|e| Error::Transport(e.to_string()))?;
            self.dispatch(event)?;
        }
        self.run_until_idle()?;
        Ok(())
    }

    /// Wait up to `timeout` for the next queued event without handling it.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn flush(&mut self) {
        let records = self.tree.take_records();
        if let Some(batch) = self.observer.filter(records) {
            self.post(Event::Mutations(batch));
        }
    }

    fn apply_payload(&mut self, payload: &str) -> Result<()> {
        let applied = match PayloadKind::of(payload) {
            PayloadKind::Markup => self.append_markup(payload).map(|_| ()),
            PayloadKind::Store => serde_json::from_str::<DocumentSet>(payload)
                .map_err(Error::from)
                .and_then(|set| self.apply_store(&set).map(|_| ())),
            PayloadKind::Unknown => Err(Error::Other("unrecognized payload".to_string())),
        };
        if let Err(e) = applied {
            log::warn!("dropping pushed payload: {}", e);
            let message = self.options.payload_notice.clone();
            self.notice(NoticeKind::Payload, &message, &e.to_string())?;
        }
        Ok(())
    }

    fn notice(&mut self, kind: NoticeKind, message: &str, detail: &str) -> Result<NodeId> {
        let node = self.tree.create_with(
            Role::Notice,
            [
                (schema::KIND, kind.as_str()),
                (schema::MESSAGE, message),
                (schema::DETAIL, detail),
            ],
        );
        let root = self.tree.root();
        self.tree.append_child(root, node)?;
        self.flush();
        Ok(node)
    }

    // ---- user actions -----------------------------------------------------

    /// Drag `item` into `target` so that it becomes the `index`-th item there
    /// (counting only items of its kind). Posts `ReorderFinished` when done.
    pub fn drag(&mut self, item: NodeId, target: NodeId, index: usize) -> Result<()> {
        let group = self.binder.check(&self.tree, item, target)?;
        let role = group.item_role();

        self.tree.detach(item)?;
        let items = self.tree.children_with_role(target, role);
        let at = match items.get(index).or(items.last()) {
            Some(&anchor) => {
                let position = self.tree.index_of(anchor).unwrap_or(0);
                if index < items.len() {
                    position
                } else {
                    position + 1
                }
            }
            None => 0,
        };
        self.tree.insert_child(target, at, item)?;

        self.flush();
        self.post(Event::ReorderFinished { group });
        Ok(())
    }

    /// Merge the slot after `affordance` into the slot before it.
    pub fn merge(&mut self, affordance: NodeId) -> Result<NodeId> {
        let target = affordance::merge(&mut self.tree, affordance)?;
        self.flush();
        Ok(target)
    }

    /// Hide a merge affordance.
    pub fn dismiss(&mut self, affordance: NodeId) -> Result<()> {
        affordance::dismiss(&mut self.tree, affordance)
    }

    /// Delete a document slot and its pages.
    pub fn remove_document(&mut self, slot: NodeId) -> Result<()> {
        self.expect_role(slot, Role::Document)?;
        self.tree.remove(slot)?;
        self.flush();
        Ok(())
    }

    /// Delete a page slot.
    pub fn remove_page(&mut self, page: NodeId) -> Result<()> {
        self.expect_role(page, Role::Page)?;
        self.tree.remove(page)?;
        self.flush();
        Ok(())
    }

    /// Rotate a page by `degrees`. Returns the new rotation.
    pub fn rotate_page(&mut self, page: NodeId, degrees: i32) -> Result<u16> {
        self.expect_role(page, Role::Page)?;
        let current = self
            .tree
            .attr(page, schema::ROTATION)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let rotation = normalize_rotation(current + i64::from(degrees));
        self.tree.set_attr(page, schema::ROTATION, rotation.to_string())?;
        Ok(rotation)
    }

    /// Toggle the mirrored flag of a page. Returns the new value.
    pub fn toggle_flip(&mut self, page: NodeId) -> Result<bool> {
        self.expect_role(page, Role::Page)?;
        let flipped = !self.tree.attr(page, schema::FLIPPED).map_or(false, parse_flag);
        self.tree.set_attr(page, schema::FLIPPED, flipped.to_string())?;
        Ok(flipped)
    }

    /// Toggle a page between shown and hidden. Returns the new status.
    pub fn toggle_hidden(&mut self, page: NodeId) -> Result<PageStatus> {
        self.expect_role(page, Role::Page)?;
        let status = PageStatus::from_attr(self.tree.attr(page, schema::STATUS)).toggled();
        self.tree.set_attr(page, schema::STATUS, status.as_str())?;
        Ok(status)
    }

    fn expect_role(&self, node: NodeId, role: Role) -> Result<()> {
        match self.tree.role(node) {
            Some(r) if r == role => Ok(()),
            Some(_) => Err(Error::InvalidMove(format!("{} is not a {}", node, role.tag()))),
            None => Err(Error::NodeNotFound(node)),
        }
    }

    // ---- lookups ----------------------------------------------------------

    /// Columns in visual order.
    pub fn columns(&self) -> Vec<NodeId> {
        self.tree.children_with_role(self.tree.root(), Role::Column)
    }

    /// Document slots of a column, in order.
    pub fn document_slots(&self, column: NodeId) -> Vec<NodeId> {
        self.tree.children_with_role(column, Role::Document)
    }

    /// Merge affordances of a column, in order.
    pub fn affordances(&self, column: NodeId) -> Vec<NodeId> {
        self.tree.children_with_role(column, Role::Merge)
    }

    /// Body (page holder) of a document slot.
    pub fn body_of(&self, slot: NodeId) -> Option<NodeId> {
        self.tree.first_child_with_role(slot, Role::Body)
    }

    /// Page slots of a document slot, in order.
    pub fn page_slots(&self, slot: NodeId) -> Vec<NodeId> {
        self.body_of(slot)
            .map(|body| self.tree.children_with_role(body, Role::Page))
            .unwrap_or_default()
    }

    /// First document slot with the given id.
    pub fn find_document(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants_with_role(self.tree.root(), Role::Document)
            .into_iter()
            .find(|&slot| self.tree.attr(slot, schema::ID) == Some(id))
    }

    /// First page slot with the given id inside a document slot.
    pub fn find_page(&self, slot: NodeId, id: &str) -> Option<NodeId> {
        self.page_slots(slot)
            .into_iter()
            .find(|&page| self.tree.attr(page, schema::ID) == Some(id))
    }

    /// Notices currently shown.
    pub fn notices(&self) -> Vec<NodeId> {
        self.tree.children_with_role(self.tree.root(), Role::Notice)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Page};

    fn set_of(names: Vec<(&str, Vec<&str>)>) -> DocumentSet {
        let mut set = DocumentSet::new();
        for (filename, pages) in names {
            let mut doc = Document::default();
            for (i, id) in pages.into_iter().enumerate() {
                doc.add_page(Page::new(id, i as u32 + 1).with_preview(format!("/{}.png", id)));
            }
            set.insert(filename, doc);
        }
        set
    }

    #[test]
    fn test_apply_store_skips_known_files() {
        let mut ws = Workspace::new();
        let first = set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"])]);
        assert_eq!(ws.apply_store(&first).unwrap().len(), 1);

        let second = set_of(vec![
            ("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"]),
            ("bbbbbbbbbbbbbbb_b.pdf", vec!["b1"]),
        ]);
        assert_eq!(ws.apply_store(&second).unwrap().len(), 1);
        assert!(ws.apply_store(&second).unwrap().is_empty());
        ws.run_until_idle().unwrap();

        assert_eq!(ws.extract().document_count(), 2);
        // Explicit materialization still duplicates.
        ws.materialize(&first).unwrap();
        ws.run_until_idle().unwrap();
        assert_eq!(ws.extract().document_count(), 3);
    }

    #[test]
    fn test_new_workspace_has_trailing_column() {
        let ws = Workspace::new();
        assert_eq!(ws.columns().len(), 1);
        assert!(ws.observer().is_armed());
        assert!(ws.extract().is_empty());
    }

    #[test]
    fn test_materialize_triggers_reconciliation() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["p1"])]))
            .unwrap();
        assert_eq!(ws.pending_events(), 1);
        ws.run_until_idle().unwrap();

        let columns = ws.columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(ws.document_slots(columns[0]).len(), 1);
        assert!(ws.document_slots(columns[1]).is_empty());
    }

    #[test]
    fn test_drag_document_into_placeholder() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![
            ("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"]),
            ("bbbbbbbbbbbbbbb_b.pdf", vec!["b1"]),
        ]))
        .unwrap();
        ws.run_until_idle().unwrap();

        // [b] [a] [empty]
        let columns = ws.columns();
        let b = ws.find_document("bbbbbbbbbbbbbbb").unwrap();
        ws.drag(b, columns[2], 0).unwrap();
        ws.run_until_idle().unwrap();

        // b's old column is gone, a fresh trailing column exists.
        let columns = ws.columns();
        assert_eq!(columns.len(), 3);
        assert_eq!(ws.document_slots(columns[1]), vec![b]);
        assert!(ws.document_slots(columns[2]).is_empty());
    }

    #[test]
    fn test_drag_document_between_slots_skips_affordances() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![
            ("aaaaaaaaaaaaaaa_a.pdf", vec![]),
            ("bbbbbbbbbbbbbbb_b.pdf", vec![]),
            ("ccccccccccccccc_c.pdf", vec![]),
        ]))
        .unwrap();
        ws.run_until_idle().unwrap();

        let columns = ws.columns();
        let target = columns[0];
        let a = ws.find_document("aaaaaaaaaaaaaaa").unwrap();
        let b = ws.find_document("bbbbbbbbbbbbbbb").unwrap();
        ws.drag(a, target, 1).unwrap();
        ws.run_until_idle().unwrap();
        ws.drag(b, target, 1).unwrap();
        ws.run_until_idle().unwrap();

        let target = ws.columns()[0];
        let ids: Vec<_> = ws
            .document_slots(target)
            .into_iter()
            .map(|s| ws.tree().attr(s, schema::ID).unwrap().to_string())
            .collect();
        assert_eq!(ids, ["ccccccccccccccc", "bbbbbbbbbbbbbbb", "aaaaaaaaaaaaaaa"]);
        assert_eq!(ws.affordances(target).len(), 2);
    }

    #[test]
    fn test_drag_page_across_documents() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![
            ("aaaaaaaaaaaaaaa_a.pdf", vec!["a1", "a2"]),
            ("bbbbbbbbbbbbbbb_b.pdf", vec!["b1"]),
        ]))
        .unwrap();
        ws.run_until_idle().unwrap();

        let a = ws.find_document("aaaaaaaaaaaaaaa").unwrap();
        let b = ws.find_document("bbbbbbbbbbbbbbb").unwrap();
        let a2 = ws.find_page(a, "a2").unwrap();
        ws.drag(a2, ws.body_of(b).unwrap(), 0).unwrap();
        ws.run_until_idle().unwrap();

        let snapshot = ws.extract();
        let doc_b = snapshot.find_document("bbbbbbbbbbbbbbb").unwrap();
        let ids: Vec<_> = doc_b.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a2", "b1"]);
        assert_eq!(doc_b.page_count, 2);
        assert_eq!(snapshot.find_document("aaaaaaaaaaaaaaa").unwrap().page_count, 1);
    }

    #[test]
    fn test_drag_rejects_mismatched_group() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"])]))
            .unwrap();
        ws.run_until_idle().unwrap();

        let a = ws.find_document("aaaaaaaaaaaaaaa").unwrap();
        let body = ws.body_of(a).unwrap();
        assert!(matches!(ws.drag(a, body, 0), Err(Error::NotReorderable(_))));
        assert_eq!(ws.pending_events(), 0);
    }

    #[test]
    fn test_attribute_actions_do_not_reconcile() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"])]))
            .unwrap();
        ws.run_until_idle().unwrap();

        let a = ws.find_document("aaaaaaaaaaaaaaa").unwrap();
        let page = ws.find_page(a, "a1").unwrap();
        assert_eq!(ws.rotate_page(page, -90).unwrap(), 270);
        assert!(ws.toggle_flip(page).unwrap());
        assert_eq!(ws.toggle_hidden(page).unwrap(), PageStatus::Hidden);
        assert_eq!(ws.pending_events(), 0);

        let p = &ws.extract().columns[0].documents[0].pages[0];
        assert_eq!(p.rotation, 270);
        assert!(p.flipped);
        assert!(p.is_hidden());
    }

    #[test]
    fn test_remove_last_document_drops_column() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"])]))
            .unwrap();
        ws.run_until_idle().unwrap();
        assert_eq!(ws.columns().len(), 2);

        let a = ws.find_document("aaaaaaaaaaaaaaa").unwrap();
        ws.remove_document(a).unwrap();
        ws.run_until_idle().unwrap();
        assert_eq!(ws.columns().len(), 1);
        assert!(ws.extract().is_empty());
    }

    #[test]
    fn test_bad_payload_leaves_notice_only() {
        let mut ws = Workspace::new();
        ws.materialize(&set_of(vec![("aaaaaaaaaaaaaaa_a.pdf", vec!["a1"])]))
            .unwrap();
        ws.run_until_idle().unwrap();
        let before = ws.extract();

        ws.post(Event::Stream(StreamEvent::Message("<column><bogus/></column>".into())));
        ws.post(Event::Stream(StreamEvent::Message("not markup".into())));
        ws.run_until_idle().unwrap();

        assert_eq!(ws.extract(), before);
        let notices = ws.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(ws.tree().attr(notices[0], schema::KIND), Some("payload"));
        assert!(!ws.stream_finished());
    }

    #[test]
    fn test_transport_failure_notice() {
        let mut ws = Workspace::new();
        ws.post(Event::Stream(StreamEvent::Failed("connection reset".into())));
        ws.run().unwrap();

        assert!(ws.stream_finished());
        let notice = ws.notices()[0];
        assert_eq!(ws.tree().attr(notice, schema::KIND), Some("transport"));
        assert_eq!(ws.tree().attr(notice, schema::DETAIL), Some("connection reset"));
        // The drop target stays in front of the notice.
        assert_eq!(ws.columns().len(), 1);
    }
}
