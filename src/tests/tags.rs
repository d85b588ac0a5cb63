//! Tags: parser tags, generic tags, attributes, and closing-mark
//! tolerance.

use super::{children, lines, parse, parse_with, tolerant};
use crate::{AttributeQuote, Node, TagStyle, text_content};

fn find_tag(doc: &Node, name: &str) -> Node {
    doc.descendants()
        .find(|n| {
            n.kind()
                .as_tag()
                .is_some_and(|t| t.name().eq_ignore_ascii_case(name))
        })
        .unwrap()
}

#[test]
fn generic_tag_body_is_wikitext() {
    let doc = parse("<div>''x''</div>");
    let tag = find_tag(&doc, "div");
    let data = tag.kind().as_tag().unwrap();
    assert_eq!(data.style(), TagStyle::Closed);
    assert_eq!(data.closing().unwrap(), "</div>");
    let content = data.content().unwrap();
    assert!(content
        .descendants()
        .any(|n| n.kind().as_format_switch().is_some()));
}

#[test]
fn parser_tag_body_is_raw_text() {
    let doc = parse("<ref>{{not parsed}}</ref>");
    let tag = find_tag(&doc, "ref");
    let data = tag.kind().as_tag().unwrap();
    assert_eq!(data.raw_content().unwrap(), "{{not parsed}}");
    assert!(!tag.descendants().any(|n| n.kind().as_template().is_some()));
}

#[test]
fn closing_tag_keeps_its_own_spelling() {
    let doc = parse("<DIV>case</div>");
    let tag = find_tag(&doc, "div");
    let data = tag.kind().as_tag().unwrap();
    assert_eq!(*data.name(), "DIV");
    assert_eq!(data.closing().unwrap(), "</div>");
}

#[test]
fn self_closing_only_tags_never_take_content() {
    let doc = parse("<br>after");
    let tag = find_tag(&doc, "br");
    assert_eq!(tag.kind().as_tag().unwrap().style(), TagStyle::Void);
    assert_eq!(tag.to_string(), "<br>");

    let doc = parse("<br/>");
    let tag = find_tag(&doc, "br");
    assert_eq!(tag.kind().as_tag().unwrap().style(), TagStyle::SelfClosing);
}

#[test]
fn attribute_quote_styles_are_detected_by_trial() {
    let doc = parse("<span a='1' b=\"2\" c=3 d/>");
    let tag = find_tag(&doc, "span");
    let attributes: Vec<Node> = tag.kind().as_tag().unwrap().attributes().iter().collect();
    assert_eq!(attributes.len(), 4);

    let quotes: Vec<AttributeQuote> = attributes
        .iter()
        .map(|a| a.kind().as_tag_attribute().unwrap().quote())
        .collect();
    assert_eq!(
        quotes,
        [
            AttributeQuote::Single,
            AttributeQuote::Double,
            AttributeQuote::Unquoted,
            AttributeQuote::Unquoted,
        ]
    );
    assert!(attributes[3]
        .kind()
        .as_tag_attribute()
        .unwrap()
        .value()
        .is_none());
}

#[test]
fn list_item_tags_end_at_the_next_opening_tag() {
    let doc = parse("<li>a<li>b");
    let tags: Vec<Node> = doc
        .descendants()
        .filter(|n| n.kind().as_tag().is_some())
        .collect();
    assert_eq!(tags.len(), 2);
    for tag in &tags {
        assert_eq!(tag.kind().as_tag().unwrap().style(), TagStyle::NotClosed);
    }
    assert_eq!(text_content(&tags[0]), "a");
    assert_eq!(text_content(&tags[1]), "b");
}

#[test]
fn unterminated_tag_is_inferred_at_the_enclosing_boundary() {
    let doc = parse_with(tolerant(), "<div><a>test</a><tag>def</div>");
    assert_eq!(doc.to_string(), "<div><a>test</a><tag>def</div>");

    let tag = find_tag(&doc, "tag");
    assert!(tag.closing_mark_inferred());
    assert_eq!(tag.kind().as_tag().unwrap().style(), TagStyle::NotClosed);
    // The inferred tag's content runs up to the enclosing `</div>`.
    assert_eq!(text_content(&tag), "def");

    let div = find_tag(&doc, "div");
    assert_eq!(div.kind().as_tag().unwrap().style(), TagStyle::Closed);
    assert!(!div.closing_mark_inferred());
}

#[test]
fn without_inference_an_unclosed_tag_decays_to_text() {
    let doc = parse("<tag>x");
    assert!(!doc.descendants().any(|n| n.kind().as_tag().is_some()));
    assert_eq!(doc.to_string(), "<tag>x");
}

#[test]
fn comments_tolerate_a_missing_terminator() {
    let doc = parse("a<!-- note -->b");
    let inline = children(&lines(&doc)[0]);
    let comment = inline[1].kind().as_comment().unwrap();
    assert!(comment.is_terminated());
    assert_eq!(*comment.text(), " note ");

    let doc = parse("a<!--runs off");
    let inline = children(&lines(&doc)[0]);
    let comment = inline[1].kind().as_comment().unwrap();
    assert!(!comment.is_terminated());
    assert_eq!(doc.to_string(), "a<!--runs off");
}
