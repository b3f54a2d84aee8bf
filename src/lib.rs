//! # pagefold
//!
//! Headless page-arrangement workspace for uploaded PDF documents.
//!
//! A workspace lays documents out in columns. Users drag documents between
//! columns, drag pages between documents, merge adjacent documents and
//! adjust individual pages; the server pushes new documents and markup
//! fragments over a server-sent event stream. After every structural
//! change a reconciliation pass keeps exactly one empty drop-target column
//! at the end and a merge affordance between every pair of adjacent
//! documents.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagefold::{load_store, render, Workspace};
//!
//! fn main() -> pagefold::Result<()> {
//!     // Load the server's filename-keyed document store
//!     let store = load_store("store.json")?;
//!
//!     let mut workspace = Workspace::new();
//!     workspace.materialize(&store)?;
//!     workspace.run_until_idle()?;
//!
//!     let json = render::to_json(&workspace.extract(), render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Order-preserving snapshots**: column, document and page order survive JSON
//! - **Reconciliation**: trailing drop target, merge affordances, reorder groups
//! - **Event queue**: a single-threaded dispatcher fed by any number of producers
//! - **Update stream**: `text/event-stream` decoding for pushed updates

pub mod affordance;
pub mod error;
pub mod extract;
pub mod materialize;
pub mod model;
pub mod observer;
pub mod options;
pub mod render;
pub mod reorder;
pub mod schema;
pub mod stream;
pub mod tree;
pub mod workspace;

// Re-export commonly used types
pub use error::{Error, Result};
pub use extract::{debug_snapshot, extract};
pub use model::{
    normalize_rotation, split_filename, Arrangement, Column, Document, DocumentSet, Orientation,
    Page, PageStatus,
};
pub use observer::{MutationBatch, ObserverState, ReconcileReport};
pub use options::WorkspaceOptions;
pub use render::{to_json, to_outline, JsonFormat};
pub use reorder::ReorderGroup;
pub use stream::{PayloadKind, SseDecoder, StreamClient, StreamEvent};
pub use tree::{NodeId, Role, Tree};
pub use workspace::{Event, NoticeKind, Workspace};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load a filename-keyed document store from a JSON file.
///
/// # Example
///
/// ```no_run
/// use pagefold::load_store;
///
/// let store = load_store("store.json").unwrap();
/// println!("Documents: {}", store.len());
/// ```
pub fn load_store<P: AsRef<Path>>(path: P) -> Result<DocumentSet> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Parse a document store from JSON text.
pub fn parse_store(json: &str) -> Result<DocumentSet> {
    Ok(serde_json::from_str(json)?)
}

/// Load a saved workspace markup file into a reconciled workspace.
///
/// # Example
///
/// ```no_run
/// use pagefold::{load_workspace, WorkspaceOptions};
///
/// let workspace = load_workspace("workspace.xml", WorkspaceOptions::default()).unwrap();
/// println!("{}", workspace.debug_snapshot().unwrap());
/// ```
pub fn load_workspace<P: AsRef<Path>>(path: P, options: WorkspaceOptions) -> Result<Workspace> {
    let markup = std::fs::read_to_string(path)?;
    Workspace::from_markup(&markup, options)
}

/// Materialize a store into a fresh workspace and return its snapshot.
///
/// # Example
///
/// ```
/// use pagefold::{parse_store, snapshot_store};
///
/// let store = parse_store(r#"{"abcdefghijklmno_report.pdf": {"pages": []}}"#).unwrap();
/// let arrangement = snapshot_store(&store).unwrap();
/// assert_eq!(arrangement.document_count(), 1);
/// ```
pub fn snapshot_store(store: &DocumentSet) -> Result<Arrangement> {
    let mut workspace = Workspace::new();
    workspace.materialize(store)?;
    workspace.run_until_idle()?;
    Ok(workspace.extract())
}
