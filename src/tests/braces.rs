//! Brace-run disambiguation.

use super::{children, lines, parse};
use crate::NodeKind;

#[test]
fn four_braces_are_not_nested_references() {
    // The first brace decays to text, the remaining three parse as an
    // argument reference, and the last closer is left over.
    let doc = parse("{{{{arg}}}}");
    let inline = children(&lines(&doc)[0]);
    assert_eq!(inline.len(), 3);

    let lead = inline[0].kind().as_plain_text().unwrap();
    assert_eq!(*lead.text(), "{");

    let reference = inline[1].kind().as_argument_reference().unwrap();
    assert_eq!(reference.name().unwrap().to_string(), "arg");
    assert_eq!(inline[1].to_string(), "{{{arg}}}");

    let tail = inline[2].kind().as_plain_text().unwrap();
    assert_eq!(*tail.text(), "}");
}

#[test]
fn two_braces_parse_a_template() {
    let doc = parse("{{T}}");
    let inline = children(&lines(&doc)[0]);
    assert!(matches!(inline[0].kind(), NodeKind::Template(_)));
}

#[test]
fn three_braces_parse_an_argument_reference() {
    let doc = parse("{{{1|def}}}");
    let inline = children(&lines(&doc)[0]);
    let reference = inline[0].kind().as_argument_reference().unwrap();
    assert_eq!(reference.name().unwrap().to_string(), "1");
    assert_eq!(reference.default_value().unwrap().to_string(), "def");
}

#[test]
fn five_braces_prefer_a_template_inside_the_triple_brace() {
    let doc = parse("{{{{{arg}}}}}");
    let inline = children(&lines(&doc)[0]);
    let reference = inline[0].kind().as_argument_reference().unwrap();
    let name = reference.name().unwrap();
    assert_eq!(name.to_string(), "{{arg}}");
    assert!(name.descendants().any(|n| n.kind().as_template().is_some()));
}

#[test]
fn runs_longer_than_five_are_literal() {
    let doc = parse("{{{{{{x}}}}}}");
    assert!(!doc.descendants().any(|n| {
        matches!(
            n.kind(),
            NodeKind::Template(_) | NodeKind::ArgumentReference(_)
        )
    }));
    assert_eq!(doc.to_string(), "{{{{{{x}}}}}}");
}

#[test]
fn surplus_reference_segments_are_kept_but_meaningless() {
    let doc = parse("{{{a|b|c}}}");
    let inline = children(&lines(&doc)[0]);
    let reference = inline[0].kind().as_argument_reference().unwrap();
    assert_eq!(reference.default_value().unwrap().to_string(), "b");
    assert_eq!(reference.surplus_segments().len(), 1);
    assert_eq!(inline[0].to_string(), "{{{a|b|c}}}");
}
