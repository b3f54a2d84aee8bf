//! Plain text outline of an arrangement.

use crate::model::{Arrangement, Document, Page};
use std::fmt::Write;

/// Render an indented outline: one line per column, document and page.
///
/// ```text
/// column-2
///   abcdefghijklmno  report.pdf (2 pages)
///     title: Quarterly
///     #1 p1 portrait 0°
///     #2 p2 landscape 90° [flipped]
/// ```
pub fn to_outline(arrangement: &Arrangement) -> String {
    let mut out = String::new();
    for column in &arrangement.columns {
        let _ = writeln!(out, "{}", column.id);
        for doc in &column.documents {
            write_document(&mut out, doc);
        }
    }
    out
}

fn write_document(out: &mut String, doc: &Document) {
    let noun = if doc.pages.len() == 1 { "page" } else { "pages" };
    let _ = writeln!(
        out,
        "  {}  {} ({} {})",
        doc.id,
        doc.display_name,
        doc.pages.len(),
        noun
    );
    if !doc.title.is_empty() {
        let _ = writeln!(out, "    title: {}", doc.title);
    }
    if let Some(modified) = doc.modified() {
        let _ = writeln!(out, "    modified: {}", modified.format("%Y-%m-%d %H:%M"));
    }
    for page in &doc.pages {
        write_page(out, page);
    }
}

fn write_page(out: &mut String, page: &Page) {
    let _ = write!(
        out,
        "    #{} {} {} {}°",
        page.page_number,
        page.id,
        page.orientation.as_str(),
        page.rotation
    );
    if page.flipped {
        out.push_str(" [flipped]");
    }
    if page.is_hidden() {
        out.push_str(" [hidden]");
    }
    out.push('\n');
}
