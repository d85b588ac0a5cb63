use crate::{Node, Options, WikitextParser, inspect};

mod braces;
mod links;
mod paragraphs;
mod parsing;
mod tables;
mod tags;
mod templates;
mod tree_edits;

/// Parses with the default options, dumping the tree for failed-test
/// debugging.
#[track_caller]
fn parse(input: &str) -> Node {
    parse_with(Options::default(), input)
}

#[track_caller]
fn parse_with(options: Options, input: &str) -> Node {
    let _ = env_logger::try_init();
    let parser = WikitextParser::new(options);
    let doc = parser.parse(input).unwrap();
    log::debug!("parsed {input:?}:\n{}", inspect(&doc));
    doc
}

/// Options with closing-mark inference enabled.
fn tolerant() -> Options {
    Options {
        allow_closing_mark_inference: true,
        ..Options::default()
    }
}

#[track_caller]
fn assert_roundtrip(input: &str) {
    let doc = parse(input);
    assert_eq!(doc.to_string(), input, "round-trip failed for {input:?}");
}

/// The lines of a parsed document.
fn lines(doc: &Node) -> Vec<Node> {
    doc.kind().as_document().unwrap().lines().iter().collect()
}

/// The direct children of a node.
fn children(node: &Node) -> Vec<Node> {
    node.children().collect()
}
