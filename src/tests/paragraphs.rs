//! The paragraph break policy, reproduced scenario by scenario.

use super::{children, lines, parse};
use crate::NodeKind;

#[test]
fn single_line_stays_open() {
    let doc = parse("Hello, world!");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 1);
    let paragraph = lines[0].kind().as_paragraph().unwrap();
    assert!(!paragraph.is_closed());
    assert_eq!(lines[0].to_string(), "Hello, world!");
}

#[test]
fn trailing_break_closes() {
    let doc = parse("Hello, world!\n");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 1);
    let paragraph = lines[0].kind().as_paragraph().unwrap();
    assert!(paragraph.is_closed());
    assert_eq!(lines[0].to_string(), "Hello, world!\n");
}

#[test]
fn double_break_starts_empty_closed_paragraph() {
    let doc = parse("Hello, world!\n\n");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 2);

    let first = lines[0].kind().as_paragraph().unwrap();
    assert!(first.is_closed());
    assert_eq!(lines[0].to_string(), "Hello, world!\n");

    let second = lines[1].kind().as_paragraph().unwrap();
    assert!(second.is_closed());
    // Empty apart from the break that created it.
    assert_eq!(lines[1].to_string(), "\n");
}

#[test]
fn single_break_merges_lines() {
    let doc = parse("a\nb");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].to_string(), "a\nb");
    // The merged content collapses into one plain text node.
    let inner = children(&lines[0]);
    assert_eq!(inner.len(), 1);
    assert!(matches!(inner[0].kind(), NodeKind::PlainText(_)));
}

#[test]
fn double_break_separates_paragraphs() {
    let doc = parse("a\n\nb");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].kind().as_paragraph().unwrap().is_closed());
    assert!(!lines[1].kind().as_paragraph().unwrap().is_closed());
    assert_eq!(lines[0].to_string(), "a\n");
    assert_eq!(lines[1].to_string(), "\nb");
}

#[test]
fn structurally_different_line_closes_paragraph() {
    let doc = parse("a\n== b ==");
    let lines = lines(&doc);
    assert_eq!(lines.len(), 2);
    let paragraph = lines[0].kind().as_paragraph().unwrap();
    assert!(paragraph.is_closed());
    assert_eq!(lines[0].to_string(), "a\n");
    assert!(lines[1].kind().as_heading().is_some());
}

#[test]
fn second_break_before_terminator_keeps_empty_paragraph() {
    // Inside a template argument the nested block sees the `}}` terminator
    // right after the second break; the empty paragraph is still produced.
    let doc = parse("{{T|a\n\n}}");
    let lines = lines(&doc);
    let template = children(&lines[0])[0].clone();
    let argument = template.kind().as_template().unwrap().arguments().first().unwrap();
    let value = argument.kind().as_template_argument().unwrap().value().unwrap();
    let value_lines = super::lines(&value);
    assert_eq!(value_lines.len(), 2);
    assert!(value_lines[0].kind().as_paragraph().unwrap().is_closed());
    assert!(value_lines[1].kind().as_paragraph().unwrap().is_closed());
    assert_eq!(value.to_string(), "a\n\n");
}

#[test]
fn empty_document_has_no_lines() {
    let doc = parse("");
    assert!(lines(&doc).is_empty());
    assert_eq!(doc.to_string(), "");
}
