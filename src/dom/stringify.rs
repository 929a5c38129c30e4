//! Serializer rendering a document tree back to markup.
//!
//! Attribute values round-trip exactly as stored (aside from `"` escaping
//! inside the quoted form), so a value spliced at a given offset by the
//! rewrite engine is not re-shifted on output.

use crate::dom::node::{Document, NodeId, NodeKind};

/// How empty elements and boolean attributes are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// HTML output: void elements have no close tag, boolean attributes
    /// collapse to their bare name.
    Html,
    /// XHTML output: empty void elements self-close as `<br />`, other
    /// empty elements render an explicit close tag.
    #[default]
    Xhtml,
    /// XML output: any empty element self-closes as `<x/>`.
    Xml,
}

/// Options controlling serialization.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Output mode.
    pub mode: RenderMode,
}

/// HTML attributes that may render collapsed when their value is empty.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "hidden",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "open",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
    "typemustmatch",
];

/// Elements without a close tag in HTML output.
const SINGLE_TAGS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "command", "embed", "frame", "hr", "img", "input",
    "isindex", "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Render a document tree to markup text.
pub fn stringify(doc: &Document, options: &RenderOptions) -> String {
    let mut out = String::new();
    for &child in doc.node(doc.root()).children() {
        render_node(doc, child, options, &mut out);
    }
    out
}

fn render_node(doc: &Document, id: NodeId, options: &RenderOptions, out: &mut String) {
    let node = doc.node(id);
    match node.kind() {
        NodeKind::Root => {
            for &child in node.children() {
                render_node(doc, child, options, out);
            }
        }
        NodeKind::Element => render_tag(doc, id, options, out),
        NodeKind::Text => out.push_str(node.data()),
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(node.data());
            out.push_str("-->");
        }
        NodeKind::CData => {
            out.push_str("<![CDATA[");
            out.push_str(node.data());
            out.push_str("]]>");
        }
        NodeKind::Directive => {
            out.push('<');
            out.push_str(node.data());
            out.push('>');
        }
    }
}

fn render_tag(doc: &Document, id: NodeId, options: &RenderOptions, out: &mut String) {
    let node = doc.node(id);
    let name = node.name();

    out.push('<');
    out.push_str(name);
    for (key, value) in node.attrs() {
        out.push(' ');
        if value.is_empty() && is_boolean_attribute(key) && options.mode == RenderMode::Html {
            out.push_str(key);
        } else {
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }

    let has_children = !node.children().is_empty();
    match options.mode {
        RenderMode::Xml if !has_children => {
            out.push_str("/>");
        }
        RenderMode::Xhtml if !has_children => {
            if is_single_tag(name) {
                out.push_str(" />");
            } else {
                out.push_str("></");
                out.push_str(name);
                out.push('>');
            }
        }
        _ => {
            out.push('>');
            for &child in node.children() {
                render_node(doc, child, options, out);
            }
            if options.mode != RenderMode::Html || !is_single_tag(name) {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES
        .iter()
        .any(|attr| name.eq_ignore_ascii_case(attr))
}

fn is_single_tag(name: &str) -> bool {
    SINGLE_TAGS.iter().any(|tag| name.eq_ignore_ascii_case(tag))
}
