//! Internal links, bracketed external links, and bare autolinks.

use super::{children, lines, parse, parse_with};
use crate::{Node, NodeKind, Options};

fn first_wikilink(doc: &Node) -> Node {
    doc.descendants()
        .find(|n| n.kind().as_wiki_link().is_some())
        .unwrap()
}

#[test]
fn target_and_text() {
    let doc = parse("[[Page|label]]");
    let link = first_wikilink(&doc);
    let data = link.kind().as_wiki_link().unwrap();
    assert_eq!(data.target().unwrap().to_string(), "Page");
    assert_eq!(data.text().unwrap().to_string(), "label");

    let doc = parse("[[Page]]");
    let link = first_wikilink(&doc);
    assert!(link.kind().as_wiki_link().unwrap().text().is_none());
}

#[test]
fn later_pipes_belong_to_the_text() {
    let doc = parse("[[a|b|c]]");
    let link = first_wikilink(&doc);
    let data = link.kind().as_wiki_link().unwrap();
    assert_eq!(data.target().unwrap().to_string(), "a");
    assert_eq!(data.text().unwrap().to_string(), "b|c");
}

#[test]
fn image_namespaces_flag_the_link() {
    let doc = parse("[[File:X.png|thumb]]");
    assert!(first_wikilink(&doc).kind().as_wiki_link().unwrap().is_image());

    let doc = parse("[[image:x.png]]");
    assert!(first_wikilink(&doc).kind().as_wiki_link().unwrap().is_image());

    let doc = parse("[[Talk:X]]");
    assert!(!first_wikilink(&doc).kind().as_wiki_link().unwrap().is_image());
}

#[test]
fn wikilinks_do_not_nest() {
    let doc = parse("[[a[[b]]c]]");
    let links: Vec<Node> = doc
        .descendants()
        .filter(|n| n.kind().as_wiki_link().is_some())
        .collect();
    assert_eq!(links.len(), 1);
    let data = links[0].kind().as_wiki_link().unwrap();
    assert_eq!(data.target().unwrap().to_string(), "b");
}

#[test]
fn empty_target_is_rejected_unless_allowed() {
    let doc = parse("[[]]");
    assert!(!doc.descendants().any(|n| n.kind().as_wiki_link().is_some()));

    let options = Options {
        allow_empty_wikilink_target: true,
        ..Options::default()
    };
    let doc = parse_with(options, "[[]]");
    assert!(doc.descendants().any(|n| n.kind().as_wiki_link().is_some()));
}

#[test]
fn bracketed_external_link() {
    let doc = parse("[http://example.com/ link text]");
    let link = children(&lines(&doc)[0])[0].clone();
    let data = link.kind().as_external_link().unwrap();
    assert!(data.has_brackets());
    assert_eq!(data.target().unwrap().to_string(), "http://example.com/");
    // The separating whitespace belongs to the display text.
    assert_eq!(data.text().unwrap().to_string(), " link text");
}

#[test]
fn bracketed_target_may_contain_expandable_content() {
    let doc = parse("[http://{{host}}/ x]");
    let link = children(&lines(&doc)[0])[0].clone();
    let data = link.kind().as_external_link().unwrap();
    assert!(data
        .target()
        .unwrap()
        .descendants()
        .any(|n| n.kind().as_template().is_some()));
}

#[test]
fn unknown_scheme_is_not_a_link() {
    let doc = parse("[x]");
    assert!(!doc
        .descendants()
        .any(|n| n.kind().as_external_link().is_some()));
    assert_eq!(doc.to_string(), "[x]");
}

#[test]
fn bare_urls_autolink_conservatively() {
    let doc = parse("see http://example.com. done");
    let inline = children(&lines(&doc)[0]);
    assert_eq!(inline.len(), 3);
    assert!(matches!(inline[0].kind(), NodeKind::PlainText(_)));
    let data = inline[1].kind().as_external_link().unwrap();
    assert!(!data.has_brackets());
    assert!(data.text().is_none());
    assert_eq!(data.target().unwrap().to_string(), "http://example.com");
    assert_eq!(inline[2].kind().as_plain_text().unwrap().text().as_str(), ". done");
}

#[test]
fn urls_inside_words_do_not_autolink() {
    let doc = parse("xhttp://example.com");
    assert!(!doc
        .descendants()
        .any(|n| n.kind().as_external_link().is_some()));
}
