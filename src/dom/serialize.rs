//! DOM to HTML text serialization.
//!
//! Deterministic: the same tree always produces the same bytes. Text and
//! attribute values are escaped, except inside `script`/`style` (raw text
//! elements) and [`NodeData::Raw`] nodes, which are emitted verbatim.

use std::fmt::Write;

use super::{Dom, NodeData, NodeId};

/// Elements with no content and no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are not entity-escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Dom {
    /// Serialize the whole document to HTML text.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.document()) {
            self.write_node(child, false, &mut out);
        }
        out
    }

    /// Serialize a single subtree to HTML text.
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {
                for child in self.children(id) {
                    self.write_node(child, raw_text, out);
                }
            }
            NodeData::Doctype { name } => {
                let _ = write!(out, "<!DOCTYPE {}>", name);
                out.push('\n');
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeData::Raw(markup) => {
                out.push_str(markup);
            }
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeData::Element { name, attrs, .. } => {
                let tag = name.local.as_ref();
                let _ = write!(out, "<{}", tag);
                for attr in attrs {
                    let _ = write!(
                        out,
                        " {}=\"{}\"",
                        attr.name.local.as_ref(),
                        escape_attr(&attr.value)
                    );
                }

                if VOID_ELEMENTS.contains(&tag) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');

                let raw_children = RAW_TEXT_ELEMENTS.contains(&tag);
                for child in self.children(id) {
                    self.write_node(child, raw_children, out);
                }

                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
