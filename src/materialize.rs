//! Layout materialization: [`DocumentSet`] -> presentation tree.
//!
//! Each document becomes its own column at the front of the workspace:
//!
//! ```text
//! column(id)
//! └─ document(id, page-count)
//!    ├─ header(display-name, title, author, ...)
//!    └─ body
//!       └─ page(id, pagenumber, ...) ─ img(src)
//! ```

use crate::error::Result;
use crate::model::{split_filename_at, Document, DocumentSet, Page};
use crate::schema;
use crate::tree::{NodeId, Role, Tree};

/// Hands out column ids that are not in use in the tree.
#[derive(Debug, Clone)]
pub struct ColumnIds {
    prefix: String,
    next: u64,
}

impl ColumnIds {
    /// Create a generator producing `{prefix}-1`, `{prefix}-2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Next id not used by any column currently in the tree.
    pub fn next_id(&mut self, tree: &Tree) -> String {
        let taken: Vec<&str> = tree
            .descendants_with_role(tree.root(), Role::Column)
            .into_iter()
            .filter_map(|c| tree.attr(c, schema::ID))
            .collect();
        loop {
            let id = format!("{}-{}", self.prefix, self.next);
            self.next += 1;
            if !taken.contains(&id.as_str()) {
                return id;
            }
        }
    }
}

/// Prepend one column per document, in iteration order, so the last entry
/// of `documents` ends up first. Returns the new columns in visual order.
///
/// The same filename materialized twice yields two independent columns.
pub fn materialize(
    tree: &mut Tree,
    documents: &DocumentSet,
    ids: &mut ColumnIds,
    id_len: usize,
) -> Result<Vec<NodeId>> {
    let root = tree.root();
    let mut columns = Vec::with_capacity(documents.len());

    for (filename, record) in documents.iter() {
        let (id, display_name) = split_filename_at(filename, id_len);
        let column_id = ids.next_id(tree);
        let column = tree.create_with(Role::Column, [(schema::ID, column_id)]);

        let slot = build_document(tree, &id, &display_name, record)?;
        tree.append_child(column, slot)?;
        tree.prepend_child(root, column)?;
        log::debug!(
            "materialized {} ({} pages) into {}",
            id,
            record.pages.len(),
            tree.attr(column, schema::ID).unwrap_or_default()
        );
        columns.push(column);
    }

    columns.reverse();
    Ok(columns)
}

/// Build a detached document slot with header and body.
pub fn build_document(
    tree: &mut Tree,
    id: &str,
    display_name: &str,
    record: &Document,
) -> Result<NodeId> {
    let slot = tree.create_with(
        Role::Document,
        [
            (schema::ID, id.to_string()),
            (schema::PAGE_COUNT, record.pages.len().to_string()),
        ],
    );

    let header = tree.create_with(
        Role::Header,
        [
            (schema::DISPLAY_NAME, display_name),
            (schema::TITLE, record.title.as_str()),
            (schema::AUTHOR, record.author.as_str()),
            (schema::SUBJECT, record.subject.as_str()),
            (schema::CREATOR, record.creator.as_str()),
            (schema::PRODUCER, record.producer.as_str()),
            (schema::VERSION, record.version.as_str()),
            (schema::CREATION_DATE, record.creation_date.as_str()),
            (schema::MODIFICATION_DATE, record.modification_date.as_str()),
            (schema::PAGE_SIZE, record.page_size.as_str()),
        ],
    );
    tree.append_child(slot, header)?;

    let body = tree.create(Role::Body);
    for page in &record.pages {
        let node = build_page(tree, page)?;
        tree.append_child(body, node)?;
    }
    tree.append_child(slot, body)?;

    Ok(slot)
}

/// Build a detached page slot with its preview image.
pub fn build_page(tree: &mut Tree, page: &Page) -> Result<NodeId> {
    let node = tree.create_with(
        Role::Page,
        [
            (schema::ID, page.id.clone()),
            (schema::PAGE_NUMBER, page.page_number.to_string()),
            (schema::ORIENTATION, page.orientation.as_str().to_string()),
            (schema::ROTATION, page.rotation.to_string()),
            (schema::FLIPPED, page.flipped.to_string()),
            (schema::PREVIEW_PATH, page.preview_path.clone()),
            (schema::STATUS, page.status.as_str().to_string()),
        ],
    );
    let img = tree.create_with(Role::Image, [(schema::SRC, page.preview_path.as_str())]);
    tree.append_child(node, img)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    fn report() -> DocumentSet {
        let mut doc = Document::default();
        doc.title = "Quarterly".to_string();
        doc.add_page(Page::new("p1", 1).with_preview("/a.png"));
        doc.add_page(Page::new("p2", 2).with_preview("/b.png"));
        let mut set = DocumentSet::new();
        set.insert("abcdefghijklmno_report.pdf", doc);
        set
    }

    #[test]
    fn test_materialize_single_document() {
        let mut tree = Tree::new();
        let mut ids = ColumnIds::new("column");
        let columns = materialize(&mut tree, &report(), &mut ids, 15).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(tree.children(tree.root()), columns.as_slice());

        let slot = tree.children_with_role(columns[0], Role::Document)[0];
        assert_eq!(tree.attr(slot, schema::ID), Some("abcdefghijklmno"));
        assert_eq!(tree.attr(slot, schema::PAGE_COUNT), Some("2"));
        let header = tree.first_child_with_role(slot, Role::Header).unwrap();
        assert_eq!(tree.attr(header, schema::DISPLAY_NAME), Some("report.pdf"));

        let pages = tree.descendants_with_role(slot, Role::Page);
        let ids: Vec<_> = pages.iter().map(|&p| tree.attr(p, schema::ID).unwrap()).collect();
        assert_eq!(ids, ["p1", "p2"]);
        let img = tree.first_child_with_role(pages[0], Role::Image).unwrap();
        assert_eq!(tree.attr(img, schema::SRC), Some("/a.png"));
    }

    #[test]
    fn test_last_entry_ends_up_first() {
        let mut set = DocumentSet::new();
        set.insert("aaaaaaaaaaaaaaa_first.pdf", Document::default());
        set.insert("bbbbbbbbbbbbbbb_second.pdf", Document::default());

        let mut tree = Tree::new();
        let mut ids = ColumnIds::new("column");
        materialize(&mut tree, &set, &mut ids, 15).unwrap();

        let a = extract(&tree);
        assert_eq!(a.columns[0].documents[0].id, "bbbbbbbbbbbbbbb");
        assert_eq!(a.columns[1].documents[0].id, "aaaaaaaaaaaaaaa");
    }

    #[test]
    fn test_duplicate_materialization_creates_two_columns() {
        let mut tree = Tree::new();
        let mut ids = ColumnIds::new("column");
        materialize(&mut tree, &report(), &mut ids, 15).unwrap();
        materialize(&mut tree, &report(), &mut ids, 15).unwrap();

        let a = extract(&tree);
        assert_eq!(a.columns.len(), 2);
        assert_ne!(a.columns[0].id, a.columns[1].id);
    }

    #[test]
    fn test_column_ids_skip_taken() {
        let mut tree = Tree::new();
        let root = tree.root();
        let col = tree.create_with(Role::Column, [(schema::ID, "column-1")]);
        tree.append_child(root, col).unwrap();

        let mut ids = ColumnIds::new("column");
        assert_eq!(ids.next_id(&tree), "column-2");
        assert_eq!(ids.next_id(&tree), "column-3");
    }

    #[test]
    fn test_roundtrip_fields() {
        let mut tree = Tree::new();
        let mut ids = ColumnIds::new("column");
        let set = report();
        materialize(&mut tree, &set, &mut ids, 15).unwrap();

        let extracted = extract(&tree);
        let doc = &extracted.columns[0].documents[0];
        let mut expected = set.get("abcdefghijklmno_report.pdf").unwrap().clone();
        expected.id = "abcdefghijklmno".to_string();
        expected.display_name = "report.pdf".to_string();
        assert_eq!(doc, &expected);
    }
}
