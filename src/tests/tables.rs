//! Table structure and the cell-terminator masking rule.

use super::{lines, parse, parse_with, tolerant};
use crate::{CellKind, Node};

fn rows(table: &Node) -> Vec<Node> {
    table.kind().as_table().unwrap().rows().iter().collect()
}

fn cells(row: &Node) -> Vec<Node> {
    row.kind().as_table_row().unwrap().cells().iter().collect()
}

#[test]
fn rows_and_cells() {
    let doc = parse("{|\n|-\n| a || b\n|}");
    let table = lines(&doc)[0].clone();
    let rows = rows(&table);
    assert_eq!(rows.len(), 1);
    let cells = cells(&rows[0]);
    assert_eq!(cells.len(), 2);
    assert_eq!(
        cells[0].kind().as_table_cell().unwrap().content().unwrap().to_string(),
        " a ",
    );
    assert_eq!(
        cells[1].kind().as_table_cell().unwrap().content().unwrap().to_string(),
        " b",
    );
}

#[test]
fn captions_and_headers() {
    let doc = parse("{| class=\"wikitable\"\n|+ cap\n! h1 !! h2\n|-\n| c1\n|}");
    let table = lines(&doc)[0].clone();
    let rows = rows(&table);
    assert_eq!(rows.len(), 2);

    // Cells before the first explicit `|-` live in an implicit leading row.
    let implicit = cells(&rows[0]);
    let kinds: Vec<CellKind> = implicit
        .iter()
        .map(|c| c.kind().as_table_cell().unwrap().cell_kind())
        .collect();
    assert_eq!(kinds, [CellKind::Caption, CellKind::Header, CellKind::Header]);

    let explicit = cells(&rows[1]);
    assert_eq!(explicit.len(), 1);
    assert_eq!(
        explicit[0].kind().as_table_cell().unwrap().cell_kind(),
        CellKind::Data,
    );
}

#[test]
fn single_pipe_introduces_cell_attributes() {
    let doc = parse("{|\n| style=\"a\" | text\n|}");
    let table = lines(&doc)[0].clone();
    let cell = cells(&rows(&table)[0])[0].clone();
    let data = cell.kind().as_table_cell().unwrap();
    assert_eq!(data.attributes().unwrap().to_string(), " style=\"a\" ");
    assert_eq!(data.content().unwrap().to_string(), " text");

    // A doubled pipe is a cell separator, not an attribute delimiter.
    let doc = parse("{|\n| a || b\n|}");
    let table = lines(&doc)[0].clone();
    let cell = cells(&rows(&table)[0])[0].clone();
    assert!(cell.kind().as_table_cell().unwrap().attributes().is_none());
}

#[test]
fn cell_content_crosses_plain_lines() {
    // Inside a cell, the cell's own separators take precedence over the
    // line terminator of the enclosing production.
    let doc = parse("{|\n| a\ncontinued\n|}");
    let table = lines(&doc)[0].clone();
    let cell = cells(&rows(&table)[0])[0].clone();
    assert_eq!(
        cell.kind().as_table_cell().unwrap().content().unwrap().to_string(),
        " a\ncontinued",
    );
}

#[test]
fn templates_parse_inside_cells() {
    let doc = parse("{|\n| {{T|x}}\n|}");
    let table = lines(&doc)[0].clone();
    assert!(table.descendants().any(|n| n.kind().as_template().is_some()));
}

#[test]
fn unterminated_table_needs_inference() {
    let doc = parse("{|\n| a");
    assert!(!doc.descendants().any(|n| n.kind().as_table().is_some()));
    assert_eq!(doc.to_string(), "{|\n| a");

    let doc = parse_with(tolerant(), "{|\n| a");
    let table = lines(&doc)[0].clone();
    assert!(table.kind().as_table().is_some());
    assert!(table.closing_mark_inferred());
    assert_eq!(doc.to_string(), "{|\n| a");
}

#[test]
fn tables_only_start_at_column_zero() {
    let doc = parse("x {|\n|}");
    assert!(!doc.descendants().any(|n| n.kind().as_table().is_some()));
}
