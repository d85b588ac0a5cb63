//! A round-trippable wikitext parser and mutable syntax tree.
//!
//! [`WikitextParser`] parses MediaWiki markup into a tree of [`Node`]s using
//! a backtracking recursive-descent engine. The tree is fully editable —
//! nodes can be inserted, removed and moved while parent and sibling
//! navigation stays consistent — and any node that was not edited renders
//! back to exactly the text it was parsed from:
//!
//! ```
//! use wikitext_tree::WikitextParser;
//!
//! let parser = WikitextParser::default();
//! let doc = parser.parse("== Hello ==\n{{Infobox|name=World}}").unwrap();
//! assert_eq!(doc.to_string(), "== Hello ==\n{{Infobox|name=World}}");
//! ```
//!
//! Malformed markup never fails the parse: in the worst case a construct
//! decays to plain text, and optionally a missing `}}` or closing tag is
//! tolerated by inferring the closing mark (see
//! [`Options::allow_closing_mark_inference`]). Errors from
//! [`WikitextParser::parse`] only ever report cancellation or programmer
//! mistakes.

mod codemap;
mod config;
mod helpers;
mod inspect;
mod parser;
mod trace;
mod tree;

#[cfg(test)]
mod tests;

pub use codemap::{LineCol, Span};
pub use config::Options;
pub use helpers::{normalize_argument_name, normalize_title, text_content};
pub use inspect::{Inspect, inspect};
pub use parser::{CancelToken, ParseError, WikitextParser};
pub use trace::{LogSink, TraceSink};
pub use tree::{
    Annotation, ArgumentReference, AttributeQuote, CellKind, Children, Comment, Descendants,
    Document, ExternalLink, FormatSwitch, Heading, HorizontalRule, Iter, ListItem, Node,
    NodeClass, NodeCollection, NodeKind, Paragraph, PlainText, Run, SwitchKind, Table, TableCell,
    TableRow,
    Tag, TagAttribute, TagStyle, Template, TemplateArgument, TreeError, WikiLink, classes,
};
