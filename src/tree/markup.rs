//! Markup codec for presentation fragments.
//!
//! Fragments are XML-style elements named after node roles, with node
//! attributes carried verbatim:
//!
//! ```text
//! <column id="column-1">
//!   <document id="abcdefghijklmno" page-count="1">
//!     <header display-name="report.pdf" title="Q3"/>
//!     <body><page id="p1" pagenumber="1"><img src="/a.png"/></page></body>
//!   </document>
//! </column>
//! ```
//!
//! This is the push-channel payload format and the saved-workspace format.

use super::{NodeId, Role, Tree};
use crate::error::{Error, Result};
use crate::schema;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Render a node and its subtree. Attributes are written in name order, so
/// equal trees render to equal strings.
pub fn render(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

/// Render the children of a node, one after another.
pub fn render_children(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(node) {
        write_node(tree, child, &mut out);
    }
    out
}

fn write_node(tree: &Tree, node: NodeId, out: &mut String) {
    let Some(role) = tree.role(node) else {
        return;
    };
    out.push('<');
    out.push_str(role.tag());
    for (key, value) in tree.attrs(node) {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }

    let children = tree.children(node);
    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for &child in children {
        write_node(tree, child, out);
    }
    out.push_str("</");
    out.push_str(role.tag());
    out.push('>');
}

/// Parse a fragment into detached nodes.
///
/// Returns the top-level nodes in document order. On error every node
/// created so far is discarded, so the tree is left as it was.
pub fn parse_fragment(tree: &mut Tree, text: &str) -> Result<Vec<NodeId>> {
    let mut top = Vec::new();
    match parse_into(tree, text, &mut top) {
        Ok(()) => Ok(top),
        Err(e) => {
            for node in top {
                // Fragments are detached, so removal cannot fail on structure.
                let _ = tree.remove(node);
            }
            Err(e)
        }
    }
}

fn parse_into(tree: &mut Tree, text: &str, top: &mut Vec<NodeId>) -> Result<()> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let node = open_element(tree, e)?;
                attach(tree, &stack, top, node)?;
                stack.push(node);
            }
            Event::Empty(ref e) => {
                let node = open_element(tree, e)?;
                attach(tree, &stack, top, node)?;
            }
            Event::End(ref e) => {
                let open = stack
                    .pop()
                    .ok_or_else(|| Error::Markup("unexpected closing tag".to_string()))?;
                let expected = tree.role(open).map(|r| r.tag()).unwrap_or_default();
                if e.name().as_ref() != expected.as_bytes() {
                    return Err(Error::Markup(format!(
                        "expected </{}>, found </{}>",
                        expected,
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
            }
            Event::Text(ref t) => {
                if let Some(&current) = stack.last() {
                    if tree.role(current) == Some(Role::Notice) {
                        let message = t.unescape()?.into_owned();
                        tree.set_attr(current, schema::MESSAGE, message)?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        let tag = tree.role(*open).map(|r| r.tag()).unwrap_or_default();
        return Err(Error::Markup(format!("unclosed <{}>", tag)));
    }
    Ok(())
}

fn open_element(tree: &mut Tree, e: &BytesStart<'_>) -> Result<NodeId> {
    let name = e.name();
    let role = Role::from_tag(name.as_ref()).ok_or_else(|| {
        Error::Markup(format!(
            "unknown element <{}>",
            String::from_utf8_lossy(name.as_ref())
        ))
    })?;
    if role == Role::Workspace {
        return Err(Error::Markup("a fragment cannot contain a workspace".to_string()));
    }

    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(tree.create_with(role, attrs))
}

fn attach(tree: &mut Tree, stack: &[NodeId], top: &mut Vec<NodeId>, node: NodeId) -> Result<()> {
    match stack.last() {
        Some(&parent) => tree.append_child(parent, node),
        None => {
            top.push(node);
            Ok(())
        }
    }
}
