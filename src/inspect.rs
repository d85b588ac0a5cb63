//! Compact structural formatting of trees, for debugging and tests.

use crate::tree::{Node, NodeKind};
use core::fmt::{self, Write as _};

/// Returns a debug formatter that prints the structure of `node`, one
/// indented line per tree node.
pub fn inspect(node: &Node) -> Inspect<'_> {
    Inspect(node)
}

/// A structural debug formatter for a node and its subtree.
pub struct Inspect<'a>(&'a Node);

impl fmt::Debug for Inspect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self.0, f, 0)
    }
}

impl fmt::Display for Inspect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn write_node(node: &Node, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    f.write_str(node.kind().name())?;
    write_detail(node, f)?;
    if let Some(span) = node.span() {
        write!(f, " @ {span}")?;
    }
    f.write_char('\n')?;
    for child in node.children() {
        write_node(&child, f, depth + 1)?;
    }
    Ok(())
}

fn write_detail(node: &Node, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node.kind() {
        NodeKind::PlainText(text) => write!(f, " {:?}", &*text.text()),
        NodeKind::Paragraph(p) => {
            if p.is_closed() {
                f.write_str(" (closed)")
            } else {
                f.write_str(" (open)")
            }
        }
        NodeKind::Heading(h) => write!(f, " level={}", h.level()),
        NodeKind::ListItem(l) => write!(f, " prefix={:?}", &*l.prefix()),
        NodeKind::HorizontalRule(h) => write!(f, " dashes={}", h.dashes()),
        NodeKind::FormatSwitch(s) => write!(f, " {:?}", s.switch()),
        NodeKind::Template(t) => {
            if t.is_magic_word() {
                f.write_str(" (magic)")
            } else {
                Ok(())
            }
        }
        NodeKind::Tag(t) => write!(f, " <{}> {:?}", &*t.name(), t.style()),
        NodeKind::TagAttribute(a) => write!(f, " {:?}", &*a.name()),
        NodeKind::Comment(c) => write!(f, " {:?}", &*c.text()),
        NodeKind::TableCell(c) => write!(f, " {:?}", c.cell_kind()),
        NodeKind::WikiLink(l) => {
            if l.is_image() {
                f.write_str(" (image)")
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}
