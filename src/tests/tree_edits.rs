//! Structural edits: the intrusive list invariants, single ownership, and
//! traversal.

use super::{lines, parse};
use crate::{Node, NodeKind, Paragraph, PlainText, Run, TreeError};

#[test]
fn removing_the_first_line_promotes_the_second() {
    let doc = parse("a\n\nb");
    let all = lines(&doc);
    let (first, second) = (all[0].clone(), all[1].clone());

    first.remove().unwrap();

    let document = doc.kind().as_document().unwrap();
    assert_eq!(document.lines().first().unwrap(), second);
    assert_eq!(document.lines().len(), 1);

    // The removed node is completely detached.
    assert!(first.parent().is_none());
    assert!(first.previous_sibling().is_none());
    assert!(first.next_sibling().is_none());

    // A second removal has nothing to detach from.
    assert_eq!(first.remove(), Err(TreeError::NotInCollection));
}

#[test]
fn insert_before_and_after_keep_sibling_links_consistent() {
    let doc = parse("a\n\nb");
    let all = lines(&doc);
    let fresh = Paragraph::new();
    if let NodeKind::Paragraph(p) = fresh.kind() {
        p.inlines().append(PlainText::new("new"));
    }

    let inserted = all[1].insert_before(fresh).unwrap();
    assert_eq!(inserted.previous_sibling().unwrap(), all[0]);
    assert_eq!(inserted.next_sibling().unwrap(), all[1]);
    assert_eq!(all[0].next_sibling().unwrap(), inserted);
    assert_eq!(all[1].previous_sibling().unwrap(), inserted);
    assert_eq!(inserted.parent().unwrap(), doc);

    let last = inserted.insert_after(Paragraph::new()).unwrap();
    assert_eq!(doc.kind().as_document().unwrap().lines().len(), 4);
    assert_eq!(last.previous_sibling().unwrap(), inserted);
    assert_eq!(last.next_sibling().unwrap(), all[1]);
}

#[test]
fn attaching_a_parented_node_clones_it() {
    let source = parse("original");
    let target = parse("x\n\ny");
    let line = lines(&source)[0].clone();

    let attached = target
        .kind()
        .as_document()
        .unwrap()
        .lines()
        .append(line.clone());

    // The source tree still owns its line; the target got a deep clone.
    assert_ne!(attached, line);
    assert_eq!(line.parent().unwrap(), source);
    assert_eq!(attached.parent().unwrap(), target);
    assert_eq!(attached.to_string(), line.to_string());
    assert_eq!(target.to_string(), "x\n\nyoriginal");
}

#[test]
fn property_children_cannot_be_removed() {
    let doc = parse("{{T|x}}");
    let template = doc
        .descendants()
        .find(|n| n.kind().as_template().is_some())
        .unwrap();
    let name = template.kind().as_template().unwrap().name().unwrap();
    assert_eq!(name.parent().unwrap(), template);
    assert_eq!(name.remove(), Err(TreeError::NotInCollection));
}

#[test]
fn absorb_moves_all_members_without_copying() {
    let first = Run::new();
    let second = Run::new();
    let (a, b, c) = (
        PlainText::new("a"),
        PlainText::new("b"),
        PlainText::new("c"),
    );
    let (first_run, second_run) = (
        first.kind().as_run().unwrap(),
        second.kind().as_run().unwrap(),
    );
    first_run.inlines().append(a.clone());
    first_run.inlines().append(b.clone());
    second_run.inlines().append(c.clone());

    second_run.inlines().absorb(first_run.inlines());

    assert!(first_run.inlines().is_empty());
    assert_eq!(second_run.inlines().len(), 3);
    // The very same nodes moved; order is c, a, b.
    let members: Vec<Node> = second_run.inlines().iter().collect();
    assert_eq!(members, [c, a.clone(), b]);
    assert_eq!(a.parent().unwrap(), second);
    assert_eq!(second.to_string(), "cab");
}

#[test]
fn deep_clones_are_independent() {
    let doc = parse("''a'' b");
    let clone = doc.deep_clone();
    assert_eq!(clone.to_string(), doc.to_string());

    let text = clone
        .descendants()
        .find_map(|n| {
            n.kind().as_plain_text()?;
            Some(n)
        })
        .unwrap();
    text.kind().as_plain_text().unwrap().set_text("changed");
    assert_ne!(clone.to_string(), doc.to_string());
    assert_eq!(doc.to_string(), "''a'' b");
}

#[test]
fn descendants_walk_in_preorder() {
    let doc = parse("[[a|b]]");
    let kinds: Vec<&'static str> = doc.descendants().map(|n| n.kind().name()).collect();
    assert_eq!(
        kinds,
        [
            "Paragraph",
            "WikiLink",
            "Run",
            "PlainText",
            "Run",
            "PlainText",
        ]
    );
}

#[test]
fn collections_reject_foreign_members() {
    let doc = parse("a\n\nb");
    let other = parse("c");
    let foreign = lines(&other)[0].clone();
    let fresh = Paragraph::new();
    assert_eq!(
        doc.kind()
            .as_document()
            .unwrap()
            .lines()
            .insert_before(&foreign, fresh)
            .unwrap_err(),
        TreeError::NotInCollection,
    );
}
