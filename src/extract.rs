//! Model extraction: presentation tree -> [`Arrangement`].
//!
//! The extractor never fails. Missing attributes fall back to the defaults
//! below, and missing sub-containers (a document slot without a header or
//! body) simply contribute nothing.

use crate::error::Result;
use crate::model::{
    normalize_rotation, parse_flag, Arrangement, Column, Document, Orientation, Page, PageStatus,
};
use crate::render::{to_json, JsonFormat};
use crate::schema;
use crate::tree::{NodeId, Role, Tree};

/// Build an [`Arrangement`] from the current tree.
///
/// Columns are visited in visual order. Columns without any document slot
/// (the trailing drop target) are left out of the snapshot.
pub fn extract(tree: &Tree) -> Arrangement {
    let mut arrangement = Arrangement::new();
    for column in tree.children_with_role(tree.root(), Role::Column) {
        let extracted = extract_column(tree, column);
        if !extracted.is_empty() {
            arrangement.add_column(extracted);
        }
    }
    arrangement
}

/// Pretty JSON of the current arrangement, for inspection.
pub fn debug_snapshot(tree: &Tree) -> Result<String> {
    to_json(&extract(tree), JsonFormat::Pretty)
}

fn extract_column(tree: &Tree, column: NodeId) -> Column {
    let mut extracted = Column::new(text(tree, column, schema::ID));
    for slot in tree.children_with_role(column, Role::Document) {
        extracted.add_document(extract_document(tree, slot));
    }
    extracted
}

/// Read one document slot.
pub fn extract_document(tree: &Tree, slot: NodeId) -> Document {
    let mut doc = Document::new(text(tree, slot, schema::ID));

    if let Some(header) = tree.first_child_with_role(slot, Role::Header) {
        doc.display_name = text(tree, header, schema::DISPLAY_NAME);
        doc.title = text(tree, header, schema::TITLE);
        doc.author = text(tree, header, schema::AUTHOR);
        doc.subject = text(tree, header, schema::SUBJECT);
        doc.creator = text(tree, header, schema::CREATOR);
        doc.producer = text(tree, header, schema::PRODUCER);
        doc.version = text(tree, header, schema::VERSION);
        doc.creation_date = text(tree, header, schema::CREATION_DATE);
        doc.modification_date = text(tree, header, schema::MODIFICATION_DATE);
        doc.page_size = text(tree, header, schema::PAGE_SIZE);
    }

    if let Some(body) = tree.first_child_with_role(slot, Role::Body) {
        doc.pages = tree
            .children_with_role(body, Role::Page)
            .into_iter()
            .map(|page| extract_page(tree, page))
            .collect();
    }

    // Drags move pages without rewriting the stored count.
    doc.page_count = doc.pages.len() as u32;
    if let Some(stored) = tree.attr(slot, schema::PAGE_COUNT) {
        if stored.trim().parse::<u32>().ok() != Some(doc.page_count) {
            log::debug!(
                "document {} stores page-count {:?}, found {} page slots",
                doc.id,
                stored,
                doc.page_count
            );
        }
    }

    doc
}

/// Read one page slot.
pub fn extract_page(tree: &Tree, page: NodeId) -> Page {
    Page {
        id: text(tree, page, schema::ID),
        page_number: number(tree, page, schema::PAGE_NUMBER),
        orientation: Orientation::from_attr(tree.attr(page, schema::ORIENTATION)),
        rotation: rotation(tree, page),
        flipped: tree.attr(page, schema::FLIPPED).map_or(false, parse_flag),
        preview_path: preview_path(tree, page),
        status: PageStatus::from_attr(tree.attr(page, schema::STATUS)),
    }
}

/// String attribute, `""` when absent.
fn text(tree: &Tree, node: NodeId, key: &str) -> String {
    tree.attr(node, key).unwrap_or_default().to_string()
}

/// Unsigned attribute, `0` when absent or unparseable.
fn number(tree: &Tree, node: NodeId, key: &str) -> u32 {
    tree.attr(node, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Rotation attribute normalized to 0/90/180/270, `0` when absent.
fn rotation(tree: &Tree, node: NodeId) -> u16 {
    tree.attr(node, schema::ROTATION)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(0, normalize_rotation)
}

/// Preview path, falling back to the image source.
fn preview_path(tree: &Tree, page: NodeId) -> String {
    if let Some(path) = tree.attr(page, schema::PREVIEW_PATH) {
        return path.to_string();
    }
    tree.first_child_with_role(page, Role::Image)
        .and_then(|img| tree.attr(img, schema::SRC))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::markup::parse_fragment;

    fn tree_with(fragment: &str) -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        for node in parse_fragment(&mut tree, fragment).unwrap() {
            tree.append_child(root, node).unwrap();
        }
        tree
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let tree = tree_with(
            r#"<column id="c1"><document id="d1"><header/><body>
                 <page id="p1"/><page id="p2" pagenumber="x"/>
               </body></document></column>"#,
        );
        let a = extract(&tree);
        let doc = &a.columns[0].documents[0];
        assert_eq!(doc.page_size, "");
        assert_eq!(doc.title, "");
        assert_eq!(doc.page_count, 2);

        let page = &doc.pages[1];
        assert_eq!(page.page_number, 0);
        assert_eq!(page.orientation, Orientation::Portrait);
        assert_eq!(page.status, PageStatus::Show);
        assert_eq!(page.rotation, 0);
        assert!(!page.flipped);
    }

    #[test]
    fn test_stale_page_count_is_recomputed() {
        let tree = tree_with(
            r#"<column id="c1"><document id="d1" page-count="5"><body>
                 <page id="p1"/>
               </body></document></column>"#,
        );
        assert_eq!(extract(&tree).columns[0].documents[0].page_count, 1);
    }

    #[test]
    fn test_missing_containers_contribute_nothing() {
        let tree = tree_with(r#"<column id="c1"><document id="d1"/></column><column id="c2"/>"#);
        let a = extract(&tree);
        assert_eq!(a.columns.len(), 1);
        let doc = &a.columns[0].documents[0];
        assert_eq!(doc.id, "d1");
        assert!(doc.pages.is_empty());
        assert_eq!(doc.display_name, "");
    }

    #[test]
    fn test_page_attributes_read() {
        let tree = tree_with(
            r#"<column id="c1"><document id="d1"><body>
                 <page id="p1" pagenumber="4" pageorientation="landscape" rotation="-90"
                       flipped="true" status="hidden"><img src="/p1.png"/></page>
               </body></document></column>"#,
        );
        let page = &extract(&tree).columns[0].documents[0].pages[0];
        assert_eq!(page.page_number, 4);
        assert_eq!(page.orientation, Orientation::Landscape);
        assert_eq!(page.rotation, 270);
        assert!(page.flipped);
        assert!(page.is_hidden());
        assert_eq!(page.preview_path, "/p1.png");
    }

    #[test]
    fn test_debug_snapshot_is_pretty_json() {
        let tree = tree_with(r#"<column id="c1"><document id="d1"/></column>"#);
        let text = debug_snapshot(&tree).unwrap();
        assert!(text.contains("\"c1\""));
        assert!(text.contains('\n'));
    }
}
