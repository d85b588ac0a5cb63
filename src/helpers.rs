//! Pure helpers over the finished tree: string normalization and plain-text
//! extraction. Nothing here is used by the parsing engine itself.

use crate::tree::{Node, NodeKind};

/// Normalizes a page title the way lookup code compares titles: underscores
/// become spaces, whitespace runs collapse to a single space, and
/// surrounding whitespace is dropped.
///
/// Normalizing an already-normalized title returns it unchanged.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;
    for c in title.trim_matches(|c: char| c.is_whitespace() || c == '_').chars() {
        if c.is_whitespace() || c == '_' {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Normalizes a template argument name for lookup: surrounding whitespace is
/// ignored, nothing else changes.
///
/// Normalizing an already-normalized name returns it unchanged.
pub fn normalize_argument_name(name: &str) -> String {
    name.trim().to_string()
}

/// Renders a node to human-readable text, skipping markup: comments, tag
/// syntax, formatting switches and unexpanded templates contribute nothing;
/// links contribute their display text.
pub fn text_content(node: &Node) -> String {
    let mut out = String::new();
    collect(node, &mut out);
    out
}

fn collect_children(node: &Node, out: &mut String) {
    for child in node.children() {
        collect(&child, out);
    }
}

fn collect(node: &Node, out: &mut String) {
    match node.kind() {
        NodeKind::Document(_) | NodeKind::Paragraph(_) | NodeKind::Run(_) => {
            collect_children(node, out);
        }
        NodeKind::Heading(h) => {
            for child in node.children() {
                collect(&child, out);
            }
            out.push_str(&h.trailing());
        }
        NodeKind::ListItem(_) | NodeKind::HorizontalRule(_) => collect_children(node, out),
        NodeKind::Table(t) => {
            for row in t.rows().iter() {
                collect(&row, out);
            }
        }
        NodeKind::TableRow(r) => {
            for cell in r.cells().iter() {
                collect(&cell, out);
            }
        }
        NodeKind::TableCell(c) => {
            if let Some(content) = c.content() {
                collect(&content, out);
                out.push('\n');
            }
        }
        NodeKind::PlainText(t) => out.push_str(&t.text()),
        NodeKind::WikiLink(l) => {
            if let Some(text) = l.text() {
                collect(&text, out);
            } else if let Some(target) = l.target() {
                collect(&target, out);
            }
        }
        NodeKind::ExternalLink(l) => {
            if let Some(text) = l.text() {
                collect(&text, out);
            } else if !l.has_brackets() {
                if let Some(target) = l.target() {
                    collect(&target, out);
                }
            }
        }
        NodeKind::Tag(t) => {
            if let Some(raw) = t.raw_content() {
                out.push_str(&raw);
            } else if let Some(content) = t.content() {
                collect(&content, out);
            }
        }
        NodeKind::ArgumentReference(a) => {
            if let Some(default) = a.default_value() {
                collect(&default, out);
            }
        }
        // Unexpanded templates, formatting markup and comments have no
        // readable text of their own.
        NodeKind::Template(_)
        | NodeKind::TemplateArgument(_)
        | NodeKind::FormatSwitch(_)
        | NodeKind::TagAttribute(_)
        | NodeKind::Comment(_) => {}
    }
}
