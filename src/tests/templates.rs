//! Templates, magic words, and argument lookup semantics.

use super::{parse, parse_with, tolerant};
use crate::{Node, Options};

fn first_template(doc: &Node) -> Node {
    doc.descendants()
        .find(|n| n.kind().as_template().is_some())
        .unwrap()
}

fn argument_value(template: &Node, key: &str) -> String {
    let node = template
        .kind()
        .as_template()
        .unwrap()
        .arguments()
        .get(key)
        .unwrap();
    node.kind()
        .as_template_argument()
        .unwrap()
        .value()
        .unwrap()
        .to_string()
}

#[test]
fn duplicate_names_resolve_to_the_last() {
    let doc = parse("{{T|a=1|a=2}}");
    let template = first_template(&doc);
    assert_eq!(argument_value(&template, "a"), "2");
}

#[test]
fn positional_arguments_are_numbered_in_document_order() {
    let doc = parse("{{T|x|y}}");
    let template = first_template(&doc);
    assert_eq!(argument_value(&template, "1"), "x");
    assert_eq!(argument_value(&template, "2"), "y");
}

#[test]
fn named_arguments_do_not_shift_positional_numbering() {
    let doc = parse("{{T|a=z|x|y}}");
    let template = first_template(&doc);
    assert_eq!(argument_value(&template, "1"), "x");
    assert_eq!(argument_value(&template, "2"), "y");
    assert_eq!(argument_value(&template, "a"), "z");
}

#[test]
fn a_name_competes_with_the_positional_slot() {
    let doc = parse("{{T|x|y|2=z}}");
    let template = first_template(&doc);
    assert_eq!(argument_value(&template, "2"), "z");
    assert_eq!(argument_value(&template, "1"), "x");
}

#[test]
fn lookup_ignores_surrounding_whitespace() {
    let doc = parse("{{T| a = 1 }}");
    let template = first_template(&doc);
    assert_eq!(argument_value(&template, "a"), " 1 ");
    assert_eq!(argument_value(&template, " a "), " 1 ");
}

#[test]
fn equals_inside_nested_structures_does_not_split() {
    let doc = parse("{{T|{{U|a=b}}}}");
    let template = first_template(&doc);
    let argument = template
        .kind()
        .as_template()
        .unwrap()
        .arguments()
        .first()
        .unwrap();
    // The whole nested template is the positional value; nothing was split
    // at the inner equals sign.
    assert!(argument.kind().as_template_argument().unwrap().name().is_none());
    assert_eq!(argument.to_string(), "{{U|a=b}}");
}

#[test]
fn magic_words_take_a_colon_argument() {
    let doc = parse("{{lc:x}}");
    let template = first_template(&doc);
    let data = template.kind().as_template().unwrap();
    assert!(data.is_magic_word());
    assert!(data.has_colon_argument());
    assert_eq!(argument_value(&template, "1"), "x");

    let doc = parse("{{#if:a|b|c}}");
    let template = first_template(&doc);
    let data = template.kind().as_template().unwrap();
    assert!(data.is_magic_word());
    assert_eq!(data.arguments().len(), 3);
}

#[test]
fn case_sensitive_magic_words_do_not_fold() {
    let doc = parse("{{PAGENAME}}");
    let template = first_template(&doc);
    assert!(template.kind().as_template().unwrap().is_magic_word());

    let doc = parse("{{pagename}}");
    let template = first_template(&doc);
    assert!(!template.kind().as_template().unwrap().is_magic_word());
}

#[test]
fn a_colon_in_an_ordinary_name_stays_in_the_name() {
    let doc = parse("{{a:b:c}}");
    let template = first_template(&doc);
    let data = template.kind().as_template().unwrap();
    assert!(!data.is_magic_word());
    assert_eq!(data.name().unwrap().to_string(), "a:b:c");
    assert!(data.arguments().is_empty());
}

#[test]
fn empty_name_is_rejected_unless_allowed() {
    let doc = parse("{{}}");
    assert!(!doc.descendants().any(|n| n.kind().as_template().is_some()));
    assert_eq!(doc.to_string(), "{{}}");

    let options = Options {
        allow_empty_template_name: true,
        ..Options::default()
    };
    let doc = parse_with(options, "{{}}");
    assert!(doc.descendants().any(|n| n.kind().as_template().is_some()));
    assert_eq!(doc.to_string(), "{{}}");
}

#[test]
fn missing_close_is_inferred_when_allowed() {
    let doc = parse_with(tolerant(), "{{T|x");
    let template = first_template(&doc);
    assert!(template.closing_mark_inferred());
    assert_eq!(doc.to_string(), "{{T|x");

    // Without inference the construct decays to text.
    let doc = parse("{{T|x");
    assert!(!doc.descendants().any(|n| n.kind().as_template().is_some()));
    assert_eq!(doc.to_string(), "{{T|x");
}

#[test]
fn multi_line_argument_values_are_nested_documents() {
    let doc = parse("{{T|a\nb}}");
    let template = first_template(&doc);
    let argument = template
        .kind()
        .as_template()
        .unwrap()
        .arguments()
        .first()
        .unwrap();
    let value = argument.kind().as_template_argument().unwrap().value().unwrap();
    assert!(value.kind().as_document().is_some());
    assert_eq!(value.to_string(), "a\nb");
}
