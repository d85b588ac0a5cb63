//! The node variant catalog.
//!
//! Every variant knows three things: which child slots it has (used to wire
//! back-references and to enumerate children), how to deep-clone itself, and
//! how to re-render itself to the exact text it was parsed from. Line breaks
//! are always stored literally — inside paragraph content, in a heading's
//! trailing text, or in a table's separators — so rendering a document is a
//! plain concatenation of its lines.

use super::list::{ListCore, NodeCollection, classes};
use super::{Node, NodeSlot, SlotRef};
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{self, Write as _};
use std::rc::Rc;

/// A bold/italic formatting toggle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchKind {
    /// `''` — toggles italics.
    Italic,
    /// `'''` — toggles bold.
    Bold,
    /// `'''''` — toggles bold and italics together.
    BoldItalic,
}

impl SwitchKind {
    /// The quote run this switch renders as.
    pub fn quotes(self) -> &'static str {
        match self {
            SwitchKind::Italic => "''",
            SwitchKind::Bold => "'''",
            SwitchKind::BoldItalic => "'''''",
        }
    }
}

/// How a tag's closing side was written in the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TagStyle {
    /// `<tag>…</tag>` — an explicit closing tag was present.
    Closed,
    /// `<tag/>` — explicitly self-closed.
    SelfClosing,
    /// `<br>` — a self-closing-only tag written without a slash.
    Void,
    /// The closing mark was absent: either an unclosed list-item tag, or a
    /// tag whose closing mark the parser inferred.
    NotClosed,
    /// The opening tag itself never reached its `>`; the whole close was
    /// inferred at end of input.
    Unterminated,
}

/// The quoting style of a tag attribute value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeQuote {
    /// `name='value'`
    Single,
    /// `name="value"`
    Double,
    /// `name=value`
    Unquoted,
}

impl AttributeQuote {
    fn mark(self) -> &'static str {
        match self {
            AttributeQuote::Single => "'",
            AttributeQuote::Double => "\"",
            AttributeQuote::Unquoted => "",
        }
    }
}

/// The role of a table cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CellKind {
    /// `|` — a data cell.
    Data,
    /// `!` — a header cell.
    Header,
    /// `|+` — a table caption.
    Caption,
}

/// A whole document, or a nested wikitext block (template argument values,
/// argument reference defaults, generic tag bodies).
pub struct Document {
    lines: NodeCollection<classes::Line>,
}

impl Document {
    /// Creates an empty document node.
    pub fn new() -> Node {
        Node::new(NodeKind::Document(Document {
            lines: NodeCollection::new(),
        }))
    }

    /// The lines of the document, in order. An empty document has none.
    pub fn lines(&self) -> &NodeCollection<classes::Line> {
        &self.lines
    }
}

/// A paragraph of inline content.
pub struct Paragraph {
    inlines: NodeCollection<classes::Inline>,
    closed: Cell<bool>,
}

impl Paragraph {
    /// Creates an empty, open paragraph node.
    pub fn new() -> Node {
        Node::new(NodeKind::Paragraph(Paragraph {
            inlines: NodeCollection::new(),
            closed: Cell::new(false),
        }))
    }

    /// The inline content of the paragraph.
    pub fn inlines(&self) -> &NodeCollection<classes::Inline> {
        &self.inlines
    }

    /// Whether the paragraph was closed by its terminating line break. A
    /// closed paragraph's rendered text ends with that break; an open
    /// ("compact") paragraph renders no trailing break.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn set_closed(&self, closed: bool) {
        self.closed.set(closed);
    }
}

/// A section heading, `== title ==`.
pub struct Heading {
    level: Cell<u8>,
    inlines: NodeCollection<classes::Inline>,
    trailing: RefCell<String>,
}

impl Heading {
    /// Creates an empty heading node of the given level (1–6).
    ///
    /// # Panics
    ///
    /// Panics if `level` is outside `1..=6`.
    pub fn new(level: u8) -> Node {
        assert!((1..=6).contains(&level), "invalid heading level {level}");
        Node::new(NodeKind::Heading(Heading {
            level: Cell::new(level),
            inlines: NodeCollection::new(),
            trailing: RefCell::new(String::new()),
        }))
    }

    /// The outline level, 1–6.
    pub fn level(&self) -> u8 {
        self.level.get()
    }

    /// Changes the outline level.
    ///
    /// # Panics
    ///
    /// Panics if `level` is outside `1..=6`.
    pub fn set_level(&self, level: u8) {
        assert!((1..=6).contains(&level), "invalid heading level {level}");
        self.level.set(level);
    }

    /// The title content between the `=` runs.
    pub fn inlines(&self) -> &NodeCollection<classes::Inline> {
        &self.inlines
    }

    /// Whitespace after the closing `=` run, including the line break that
    /// ended the heading line.
    pub fn trailing(&self) -> Ref<'_, String> {
        self.trailing.borrow()
    }

    pub(crate) fn push_trailing(&self, text: &str) {
        self.trailing.borrow_mut().push_str(text);
    }
}

/// A list item line: `*`, `#`, `:`, `;` prefixes, or a leading space for
/// preformatted lines.
pub struct ListItem {
    prefix: RefCell<String>,
    inlines: NodeCollection<classes::Inline>,
}

impl ListItem {
    /// Creates an empty list item node with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Node {
        Node::new(NodeKind::ListItem(ListItem {
            prefix: RefCell::new(prefix.into()),
            inlines: NodeCollection::new(),
        }))
    }

    /// The raw bullet prefix, e.g. `*#`.
    pub fn prefix(&self) -> Ref<'_, String> {
        self.prefix.borrow()
    }

    /// The content of the item, including its stored trailing line break
    /// when one terminated the line.
    pub fn inlines(&self) -> &NodeCollection<classes::Inline> {
        &self.inlines
    }
}

/// A horizontal rule line, `----` with optional extra dashes and trailing
/// same-line content.
pub struct HorizontalRule {
    dashes: Cell<u32>,
    inlines: NodeCollection<classes::Inline>,
}

impl HorizontalRule {
    /// Creates a horizontal rule node with the given dash count (at least 4).
    ///
    /// # Panics
    ///
    /// Panics if `dashes` is less than 4.
    pub fn new(dashes: u32) -> Node {
        assert!(dashes >= 4, "a horizontal rule needs at least 4 dashes");
        Node::new(NodeKind::HorizontalRule(HorizontalRule {
            dashes: Cell::new(dashes),
            inlines: NodeCollection::new(),
        }))
    }

    /// The number of dashes the rule was written with.
    pub fn dashes(&self) -> u32 {
        self.dashes.get()
    }

    /// Content that followed the rule on the same line.
    pub fn inlines(&self) -> &NodeCollection<classes::Inline> {
        &self.inlines
    }
}

/// An inline sequence used as a single-child property: link targets and
/// texts, table attribute segments and cell content.
pub struct Run {
    inlines: NodeCollection<classes::Inline>,
}

impl Run {
    /// Creates an empty run node.
    pub fn new() -> Node {
        Node::new(NodeKind::Run(Run {
            inlines: NodeCollection::new(),
        }))
    }

    /// The inline content of the run.
    pub fn inlines(&self) -> &NodeCollection<classes::Inline> {
        &self.inlines
    }
}

/// A run of plain text.
pub struct PlainText {
    text: RefCell<String>,
}

impl PlainText {
    /// Creates a plain text node.
    pub fn new(text: impl Into<String>) -> Node {
        Node::new(NodeKind::PlainText(PlainText {
            text: RefCell::new(text.into()),
        }))
    }

    /// The text content.
    pub fn text(&self) -> Ref<'_, String> {
        self.text.borrow()
    }

    /// Replaces the text content.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = text.into();
    }

    pub(crate) fn push_str(&self, text: &str) {
        self.text.borrow_mut().push_str(text);
    }
}

/// An internal link, `[[target|text]]`.
pub struct WikiLink {
    target: NodeSlot,
    text: NodeSlot,
    image: Cell<bool>,
}

impl WikiLink {
    /// Creates a wikilink node. `target` and `text` must be [`Run`] nodes.
    pub fn new(target: Node, text: Option<Node>) -> Node {
        assert!(target.kind().as_run().is_some(), "wikilink target must be a run");
        Node::new(NodeKind::WikiLink(WikiLink {
            target: NodeSlot::new(Some(target)),
            text: NodeSlot::new(text),
            image: Cell::new(false),
        }))
    }

    /// The link target run.
    pub fn target(&self) -> Option<Node> {
        self.target.get()
    }

    /// The display text run, if a `|` was present.
    pub fn text(&self) -> Option<Node> {
        self.text.get()
    }

    /// Replaces the display text, returning the detached previous run.
    pub fn set_text(&self, text: Option<Node>) -> Option<Node> {
        self.text.set(text)
    }

    /// Whether the target's namespace prefix named an image namespace at
    /// parse time.
    pub fn is_image(&self) -> bool {
        self.image.get()
    }

    pub(crate) fn set_image(&self, image: bool) {
        self.image.set(image);
    }
}

/// An external link: bracketed `[url text]`, or a bare autolinked URL.
pub struct ExternalLink {
    target: NodeSlot,
    text: NodeSlot,
    brackets: Cell<bool>,
}

impl ExternalLink {
    /// Creates an external link node. `target` and `text` must be [`Run`]
    /// nodes.
    pub fn new(target: Node, text: Option<Node>, brackets: bool) -> Node {
        Node::new(NodeKind::ExternalLink(ExternalLink {
            target: NodeSlot::new(Some(target)),
            text: NodeSlot::new(text),
            brackets: Cell::new(brackets),
        }))
    }

    /// The link target run.
    pub fn target(&self) -> Option<Node> {
        self.target.get()
    }

    /// The display text run. Bare autolinks never have one; for bracketed
    /// links it includes the whitespace that separated it from the target.
    pub fn text(&self) -> Option<Node> {
        self.text.get()
    }

    /// Whether the link was written in brackets.
    pub fn has_brackets(&self) -> bool {
        self.brackets.get()
    }
}

/// A bold/italic quote-run switch.
pub struct FormatSwitch {
    switch: Cell<SwitchKind>,
}

impl FormatSwitch {
    /// Creates a format switch node.
    pub fn new(switch: SwitchKind) -> Node {
        Node::new(NodeKind::FormatSwitch(FormatSwitch {
            switch: Cell::new(switch),
        }))
    }

    /// Which styles the switch toggles.
    pub fn switch(&self) -> SwitchKind {
        self.switch.get()
    }
}

/// A template transclusion, `{{name|…}}`, or a magic word / parser function.
pub struct Template {
    name: NodeSlot,
    arguments: NodeCollection<classes::Argument>,
    magic: Cell<bool>,
    colon_arg: Cell<bool>,
}

impl Template {
    /// Creates a template node. `name` must be a [`Document`] node.
    pub fn new(name: Node) -> Node {
        assert!(
            name.kind().as_document().is_some(),
            "template name must be a wikitext block"
        );
        Node::new(NodeKind::Template(Template {
            name: NodeSlot::new(Some(name)),
            arguments: NodeCollection::new(),
            magic: Cell::new(false),
            colon_arg: Cell::new(false),
        }))
    }

    /// The template name block.
    pub fn name(&self) -> Option<Node> {
        self.name.get()
    }

    /// The argument collection. Named and positional arguments are
    /// interleaved in document order; see
    /// [`NodeCollection::get`](NodeCollection::get) for lookup semantics.
    pub fn arguments(&self) -> &NodeCollection<classes::Argument> {
        &self.arguments
    }

    /// Whether the name matched a configured magic word.
    pub fn is_magic_word(&self) -> bool {
        self.magic.get()
    }

    pub(crate) fn set_magic_word(&self, magic: bool) {
        self.magic.set(magic);
    }

    /// Whether the first argument was introduced by `:` rather than `|`.
    pub fn has_colon_argument(&self) -> bool {
        self.colon_arg.get()
    }

    pub(crate) fn set_colon_argument(&self, colon: bool) {
        self.colon_arg.set(colon);
    }
}

/// One argument of a template, named (`a=b`) or positional.
pub struct TemplateArgument {
    name: NodeSlot,
    value: NodeSlot,
}

impl TemplateArgument {
    /// Creates a template argument node. `name` and `value` must be
    /// [`Document`] nodes.
    pub fn new(name: Option<Node>, value: Node) -> Node {
        Node::new(NodeKind::TemplateArgument(TemplateArgument {
            name: NodeSlot::new(name),
            value: NodeSlot::new(Some(value)),
        }))
    }

    /// The name block, or `None` for a positional argument.
    pub fn name(&self) -> Option<Node> {
        self.name.get()
    }

    /// The value block.
    pub fn value(&self) -> Option<Node> {
        self.value.get()
    }

    /// Replaces the value block, returning the detached previous one.
    pub fn set_value(&self, value: Node) -> Option<Node> {
        self.value.set(Some(value))
    }
}

/// A template parameter reference, `{{{name|default}}}`.
pub struct ArgumentReference {
    name: NodeSlot,
    default: NodeSlot,
    rest: NodeCollection<classes::Wikitext>,
}

impl ArgumentReference {
    /// Creates an argument reference node. `name` and `default` must be
    /// [`Document`] nodes.
    pub fn new(name: Node, default: Option<Node>) -> Node {
        Node::new(NodeKind::ArgumentReference(ArgumentReference {
            name: NodeSlot::new(Some(name)),
            default: NodeSlot::new(default),
            rest: NodeCollection::new(),
        }))
    }

    /// The parameter name block.
    pub fn name(&self) -> Option<Node> {
        self.name.get()
    }

    /// The default value — only the first `|`-separated segment counts.
    pub fn default_value(&self) -> Option<Node> {
        self.default.get()
    }

    /// Pipe segments after the default. They carry no meaning and exist only
    /// so the node re-renders its original text.
    pub fn surplus_segments(&self) -> &NodeCollection<classes::Wikitext> {
        &self.rest
    }
}

/// An XML-like tag: a parser tag with a raw text body, or a generic tag with
/// a wikitext body.
pub struct Tag {
    name: RefCell<String>,
    attributes: NodeCollection<classes::Attribute>,
    /// Whitespace between the last attribute and the `>` or `/>`.
    before_close: RefCell<String>,
    style: Cell<TagStyle>,
    /// Raw body of a parser tag.
    raw_content: RefCell<Option<String>>,
    /// Wikitext body of a generic tag.
    content: NodeSlot,
    /// The closing tag exactly as written, e.g. `</Div >`.
    closing: RefCell<Option<String>>,
}

impl Tag {
    /// Creates a tag node with no attributes and no body.
    pub fn new(name: impl Into<String>, style: TagStyle) -> Node {
        Node::new(NodeKind::Tag(Tag {
            name: RefCell::new(name.into()),
            attributes: NodeCollection::new(),
            before_close: RefCell::new(String::new()),
            style: Cell::new(style),
            raw_content: RefCell::new(None),
            content: NodeSlot::new(None),
            closing: RefCell::new(None),
        }))
    }

    /// The tag name as written in the opening tag.
    pub fn name(&self) -> Ref<'_, String> {
        self.name.borrow()
    }

    /// The attribute collection.
    pub fn attributes(&self) -> &NodeCollection<classes::Attribute> {
        &self.attributes
    }

    /// How the tag was closed.
    pub fn style(&self) -> TagStyle {
        self.style.get()
    }

    /// The raw text body of a parser tag.
    pub fn raw_content(&self) -> Option<String> {
        self.raw_content.borrow().clone()
    }

    /// The wikitext body of a generic tag.
    pub fn content(&self) -> Option<Node> {
        self.content.get()
    }

    /// The closing tag exactly as written, if one was present.
    pub fn closing(&self) -> Option<String> {
        self.closing.borrow().clone()
    }

    pub(crate) fn set_style(&self, style: TagStyle) {
        self.style.set(style);
    }

    pub(crate) fn set_before_close(&self, ws: String) {
        *self.before_close.borrow_mut() = ws;
    }

    pub(crate) fn set_raw_content(&self, content: String) {
        *self.raw_content.borrow_mut() = Some(content);
    }

    pub(crate) fn set_content(&self, content: Node) {
        self.content.set(Some(content));
    }

    pub(crate) fn set_closing(&self, closing: String) {
        *self.closing.borrow_mut() = Some(closing);
    }
}

/// One attribute of a tag, with enough surrounding trivia to re-render the
/// tag byte-for-byte.
pub struct TagAttribute {
    leading: RefCell<String>,
    name: RefCell<String>,
    before_eq: RefCell<String>,
    after_eq: RefCell<String>,
    quote: Cell<AttributeQuote>,
    value: NodeSlot,
}

impl TagAttribute {
    /// Creates an attribute node. `value` must be a [`Run`] node when
    /// present.
    pub fn new(name: impl Into<String>, value: Option<Node>, quote: AttributeQuote) -> Node {
        Node::new(NodeKind::TagAttribute(TagAttribute {
            leading: RefCell::new(" ".to_string()),
            name: RefCell::new(name.into()),
            before_eq: RefCell::new(String::new()),
            after_eq: RefCell::new(String::new()),
            quote: Cell::new(quote),
            value: NodeSlot::new(value),
        }))
    }

    /// The attribute name.
    pub fn name(&self) -> Ref<'_, String> {
        self.name.borrow()
    }

    /// The value run, if the attribute has a value.
    pub fn value(&self) -> Option<Node> {
        self.value.get()
    }

    /// The quoting style of the value.
    pub fn quote(&self) -> AttributeQuote {
        self.quote.get()
    }

    pub(crate) fn set_trivia(&self, leading: String, before_eq: String, after_eq: String) {
        *self.leading.borrow_mut() = leading;
        *self.before_eq.borrow_mut() = before_eq;
        *self.after_eq.borrow_mut() = after_eq;
    }
}

/// An HTML comment, `<!-- … -->`.
pub struct Comment {
    text: RefCell<String>,
    closed: Cell<bool>,
}

impl Comment {
    /// Creates a comment node.
    pub fn new(text: impl Into<String>, closed: bool) -> Node {
        Node::new(NodeKind::Comment(Comment {
            text: RefCell::new(text.into()),
            closed: Cell::new(closed),
        }))
    }

    /// The raw content between the comment markers.
    pub fn text(&self) -> Ref<'_, String> {
        self.text.borrow()
    }

    /// Whether the comment's `-->` was present in the source.
    pub fn is_terminated(&self) -> bool {
        self.closed.get()
    }
}

/// A table, `{|` … `|}`.
pub struct Table {
    attrs: NodeSlot,
    rows: NodeCollection<classes::Row>,
    /// The closing delimiter exactly as written (e.g. `"\n|}"`), or `None`
    /// when it was inferred at end of input.
    end: RefCell<Option<String>>,
    /// The line break (and nothing else) that followed the table.
    trailing: RefCell<String>,
}

impl Table {
    /// Creates a table node. `attrs` must be a [`Run`] node.
    pub fn new(attrs: Node) -> Node {
        Node::new(NodeKind::Table(Table {
            attrs: NodeSlot::new(Some(attrs)),
            rows: NodeCollection::new(),
            end: RefCell::new(None),
            trailing: RefCell::new(String::new()),
        }))
    }

    /// The attribute run on the `{|` line.
    pub fn attributes(&self) -> Option<Node> {
        self.attrs.get()
    }

    /// The rows of the table. Cells appearing before the first explicit
    /// `|-` live in an implicit leading row.
    pub fn rows(&self) -> &NodeCollection<classes::Row> {
        &self.rows
    }

    pub(crate) fn set_end(&self, end: String) {
        *self.end.borrow_mut() = Some(end);
    }

    pub(crate) fn push_trailing(&self, text: &str) {
        self.trailing.borrow_mut().push_str(text);
    }
}

/// One row of a table.
pub struct TableRow {
    /// The row delimiter exactly as written (e.g. `"\n|---"`), empty for the
    /// implicit leading row.
    leading: RefCell<String>,
    attrs: NodeSlot,
    cells: NodeCollection<classes::Cell>,
}

impl TableRow {
    /// Creates a table row node. `attrs` must be a [`Run`] node when
    /// present.
    pub fn new(leading: impl Into<String>, attrs: Option<Node>) -> Node {
        Node::new(NodeKind::TableRow(TableRow {
            leading: RefCell::new(leading.into()),
            attrs: NodeSlot::new(attrs),
            cells: NodeCollection::new(),
        }))
    }

    /// The attribute run on the `|-` line, if any.
    pub fn attributes(&self) -> Option<Node> {
        self.attrs.get()
    }

    /// The cells of the row.
    pub fn cells(&self) -> &NodeCollection<classes::Cell> {
        &self.cells
    }

    pub(crate) fn is_implicit(&self) -> bool {
        self.leading.borrow().is_empty()
    }
}

/// One cell of a table row.
pub struct TableCell {
    /// The cell separator exactly as written: `"\n|"`, `"||"`, `"\n!"`,
    /// `"!!"` or `"\n|+"`.
    separator: RefCell<String>,
    kind: Cell<CellKind>,
    /// The attribute segment before a single `|`, if one was present.
    attrs: NodeSlot,
    content: NodeSlot,
}

impl TableCell {
    /// Creates a table cell node. `attrs` and `content` must be [`Run`]
    /// nodes.
    pub fn new(separator: impl Into<String>, kind: CellKind, attrs: Option<Node>, content: Node) -> Node {
        Node::new(NodeKind::TableCell(TableCell {
            separator: RefCell::new(separator.into()),
            kind: Cell::new(kind),
            attrs: NodeSlot::new(attrs),
            content: NodeSlot::new(Some(content)),
        }))
    }

    /// The role of the cell.
    pub fn cell_kind(&self) -> CellKind {
        self.kind.get()
    }

    /// The attribute run before the cell's attribute pipe, if any.
    pub fn attributes(&self) -> Option<Node> {
        self.attrs.get()
    }

    /// The cell content run.
    pub fn content(&self) -> Option<Node> {
        self.content.get()
    }
}

/// A syntax tree node variant.
pub enum NodeKind {
    /// A document or nested wikitext block.
    Document(Document),
    /// A paragraph line.
    Paragraph(Paragraph),
    /// A heading line.
    Heading(Heading),
    /// A list item line.
    ListItem(ListItem),
    /// A horizontal rule line.
    HorizontalRule(HorizontalRule),
    /// A table.
    Table(Table),
    /// A table row.
    TableRow(TableRow),
    /// A table cell.
    TableCell(TableCell),
    /// An inline sequence held as a property child.
    Run(Run),
    /// A run of plain text.
    PlainText(PlainText),
    /// An internal link.
    WikiLink(WikiLink),
    /// An external link.
    ExternalLink(ExternalLink),
    /// A bold/italic switch.
    FormatSwitch(FormatSwitch),
    /// A template or magic word.
    Template(Template),
    /// A template argument.
    TemplateArgument(TemplateArgument),
    /// A template parameter reference.
    ArgumentReference(ArgumentReference),
    /// An XML-like tag.
    Tag(Tag),
    /// A tag attribute.
    TagAttribute(TagAttribute),
    /// An HTML comment.
    Comment(Comment),
}

macro_rules! accessors {
    ($($fn_name:ident => $variant:ident, $ty:ty;)*) => {
        impl NodeKind {
            /// The variant name, for diagnostics.
            pub fn name(&self) -> &'static str {
                match self {
                    $(NodeKind::$variant(_) => stringify!($variant),)*
                }
            }

            $(
                /// Returns the variant data if this node is of that kind.
                pub fn $fn_name(&self) -> Option<&$ty> {
                    match self {
                        NodeKind::$variant(data) => Some(data),
                        _ => None,
                    }
                }
            )*
        }
    };
}

accessors! {
    as_document => Document, Document;
    as_paragraph => Paragraph, Paragraph;
    as_heading => Heading, Heading;
    as_list_item => ListItem, ListItem;
    as_horizontal_rule => HorizontalRule, HorizontalRule;
    as_table => Table, Table;
    as_table_row => TableRow, TableRow;
    as_table_cell => TableCell, TableCell;
    as_run => Run, Run;
    as_plain_text => PlainText, PlainText;
    as_wiki_link => WikiLink, WikiLink;
    as_external_link => ExternalLink, ExternalLink;
    as_format_switch => FormatSwitch, FormatSwitch;
    as_template => Template, Template;
    as_template_argument => TemplateArgument, TemplateArgument;
    as_argument_reference => ArgumentReference, ArgumentReference;
    as_tag => Tag, Tag;
    as_tag_attribute => TagAttribute, TagAttribute;
    as_comment => Comment, Comment;
}

/// Visits every child slot of a variant, in document order.
pub(crate) fn visit_slots<'a>(kind: &'a NodeKind, f: &mut dyn FnMut(SlotRef<'a>)) {
    use SlotRef::{List, Single};
    match kind {
        NodeKind::Document(d) => f(List(d.lines.core())),
        NodeKind::Paragraph(p) => f(List(p.inlines.core())),
        NodeKind::Heading(h) => f(List(h.inlines.core())),
        NodeKind::ListItem(l) => f(List(l.inlines.core())),
        NodeKind::HorizontalRule(h) => f(List(h.inlines.core())),
        NodeKind::Table(t) => {
            f(Single(&t.attrs));
            f(List(t.rows.core()));
        }
        NodeKind::TableRow(r) => {
            f(Single(&r.attrs));
            f(List(r.cells.core()));
        }
        NodeKind::TableCell(c) => {
            f(Single(&c.attrs));
            f(Single(&c.content));
        }
        NodeKind::Run(r) => f(List(r.inlines.core())),
        NodeKind::PlainText(_) | NodeKind::FormatSwitch(_) | NodeKind::Comment(_) => {}
        NodeKind::WikiLink(l) => {
            f(Single(&l.target));
            f(Single(&l.text));
        }
        NodeKind::ExternalLink(l) => {
            f(Single(&l.target));
            f(Single(&l.text));
        }
        NodeKind::Template(t) => {
            f(Single(&t.name));
            f(List(t.arguments.core()));
        }
        NodeKind::TemplateArgument(a) => {
            f(Single(&a.name));
            f(Single(&a.value));
        }
        NodeKind::ArgumentReference(a) => {
            f(Single(&a.name));
            f(Single(&a.default));
            f(List(a.rest.core()));
        }
        NodeKind::Tag(t) => {
            f(List(t.attributes.core()));
            f(Single(&t.content));
        }
        NodeKind::TagAttribute(a) => f(Single(&a.value)),
    }
}

fn clone_slot(slot: &NodeSlot) -> NodeSlot {
    NodeSlot::new(slot.get().map(|child| child.deep_clone()))
}

fn clone_collection<C: super::list::NodeClass>(src: &NodeCollection<C>) -> NodeCollection<C> {
    let dst = NodeCollection::new();
    for member in src.iter() {
        dst.append(member.deep_clone());
    }
    dst
}

/// Builds a structural copy of a variant, with every child deep-cloned and
/// detached. [`Node::new`] wires the copies' back-references.
pub(crate) fn clone_kind(kind: &NodeKind) -> NodeKind {
    match kind {
        NodeKind::Document(d) => NodeKind::Document(Document {
            lines: clone_collection(&d.lines),
        }),
        NodeKind::Paragraph(p) => NodeKind::Paragraph(Paragraph {
            inlines: clone_collection(&p.inlines),
            closed: p.closed.clone(),
        }),
        NodeKind::Heading(h) => NodeKind::Heading(Heading {
            level: h.level.clone(),
            inlines: clone_collection(&h.inlines),
            trailing: h.trailing.clone(),
        }),
        NodeKind::ListItem(l) => NodeKind::ListItem(ListItem {
            prefix: l.prefix.clone(),
            inlines: clone_collection(&l.inlines),
        }),
        NodeKind::HorizontalRule(h) => NodeKind::HorizontalRule(HorizontalRule {
            dashes: h.dashes.clone(),
            inlines: clone_collection(&h.inlines),
        }),
        NodeKind::Table(t) => NodeKind::Table(Table {
            attrs: clone_slot(&t.attrs),
            rows: clone_collection(&t.rows),
            end: t.end.clone(),
            trailing: t.trailing.clone(),
        }),
        NodeKind::TableRow(r) => NodeKind::TableRow(TableRow {
            leading: r.leading.clone(),
            attrs: clone_slot(&r.attrs),
            cells: clone_collection(&r.cells),
        }),
        NodeKind::TableCell(c) => NodeKind::TableCell(TableCell {
            separator: c.separator.clone(),
            kind: c.kind.clone(),
            attrs: clone_slot(&c.attrs),
            content: clone_slot(&c.content),
        }),
        NodeKind::Run(r) => NodeKind::Run(Run {
            inlines: clone_collection(&r.inlines),
        }),
        NodeKind::PlainText(t) => NodeKind::PlainText(PlainText {
            text: t.text.clone(),
        }),
        NodeKind::WikiLink(l) => NodeKind::WikiLink(WikiLink {
            target: clone_slot(&l.target),
            text: clone_slot(&l.text),
            image: l.image.clone(),
        }),
        NodeKind::ExternalLink(l) => NodeKind::ExternalLink(ExternalLink {
            target: clone_slot(&l.target),
            text: clone_slot(&l.text),
            brackets: l.brackets.clone(),
        }),
        NodeKind::FormatSwitch(s) => NodeKind::FormatSwitch(FormatSwitch {
            switch: s.switch.clone(),
        }),
        NodeKind::Template(t) => NodeKind::Template(Template {
            name: clone_slot(&t.name),
            arguments: clone_collection(&t.arguments),
            magic: t.magic.clone(),
            colon_arg: t.colon_arg.clone(),
        }),
        NodeKind::TemplateArgument(a) => NodeKind::TemplateArgument(TemplateArgument {
            name: clone_slot(&a.name),
            value: clone_slot(&a.value),
        }),
        NodeKind::ArgumentReference(a) => NodeKind::ArgumentReference(ArgumentReference {
            name: clone_slot(&a.name),
            default: clone_slot(&a.default),
            rest: clone_collection(&a.rest),
        }),
        NodeKind::Tag(t) => NodeKind::Tag(Tag {
            name: t.name.clone(),
            attributes: clone_collection(&t.attributes),
            before_close: t.before_close.clone(),
            style: t.style.clone(),
            raw_content: t.raw_content.clone(),
            content: clone_slot(&t.content),
            closing: t.closing.clone(),
        }),
        NodeKind::TagAttribute(a) => NodeKind::TagAttribute(TagAttribute {
            leading: a.leading.clone(),
            name: a.name.clone(),
            before_eq: a.before_eq.clone(),
            after_eq: a.after_eq.clone(),
            quote: a.quote.clone(),
            value: clone_slot(&a.value),
        }),
        NodeKind::Comment(c) => NodeKind::Comment(Comment {
            text: c.text.clone(),
            closed: c.closed.clone(),
        }),
    }
}

fn emit_list(list: &Rc<ListCore>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut cursor = list.head();
    while let Some(node) = cursor {
        emit(&node, f)?;
        cursor = node.next_sibling();
    }
    Ok(())
}

fn emit_slot(slot: &NodeSlot, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(child) = slot.get() {
        emit(&child, f)?;
    }
    Ok(())
}

fn emit_equals(level: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for _ in 0..level {
        f.write_char('=')?;
    }
    Ok(())
}

/// Renders `node` to the exact text it was parsed from.
pub(crate) fn emit(node: &Node, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node.kind() {
        NodeKind::Document(d) => emit_list(d.lines.core(), f),
        NodeKind::Paragraph(p) => emit_list(p.inlines.core(), f),
        NodeKind::Heading(h) => {
            emit_equals(h.level.get(), f)?;
            emit_list(h.inlines.core(), f)?;
            emit_equals(h.level.get(), f)?;
            f.write_str(&h.trailing.borrow())
        }
        NodeKind::ListItem(l) => {
            f.write_str(&l.prefix.borrow())?;
            emit_list(l.inlines.core(), f)
        }
        NodeKind::HorizontalRule(h) => {
            for _ in 0..h.dashes.get() {
                f.write_char('-')?;
            }
            emit_list(h.inlines.core(), f)
        }
        NodeKind::Table(t) => {
            f.write_str("{|")?;
            emit_slot(&t.attrs, f)?;
            emit_list(t.rows.core(), f)?;
            if let Some(end) = t.end.borrow().as_deref() {
                f.write_str(end)?;
            }
            f.write_str(&t.trailing.borrow())
        }
        NodeKind::TableRow(r) => {
            f.write_str(&r.leading.borrow())?;
            emit_slot(&r.attrs, f)?;
            emit_list(r.cells.core(), f)
        }
        NodeKind::TableCell(c) => {
            f.write_str(&c.separator.borrow())?;
            if c.attrs.get().is_some() {
                emit_slot(&c.attrs, f)?;
                f.write_char('|')?;
            }
            emit_slot(&c.content, f)
        }
        NodeKind::Run(r) => emit_list(r.inlines.core(), f),
        NodeKind::PlainText(t) => f.write_str(&t.text.borrow()),
        NodeKind::WikiLink(l) => {
            f.write_str("[[")?;
            emit_slot(&l.target, f)?;
            if l.text.get().is_some() {
                f.write_char('|')?;
                emit_slot(&l.text, f)?;
            }
            f.write_str("]]")
        }
        NodeKind::ExternalLink(l) => {
            if l.brackets.get() {
                f.write_char('[')?;
                emit_slot(&l.target, f)?;
                emit_slot(&l.text, f)?;
                f.write_char(']')
            } else {
                emit_slot(&l.target, f)
            }
        }
        NodeKind::FormatSwitch(s) => f.write_str(s.switch.get().quotes()),
        NodeKind::Template(t) => {
            f.write_str("{{")?;
            emit_slot(&t.name, f)?;
            let mut cursor = t.arguments.core().head();
            let mut first = true;
            while let Some(argument) = cursor {
                if first && t.colon_arg.get() {
                    f.write_char(':')?;
                } else {
                    f.write_char('|')?;
                }
                first = false;
                emit(&argument, f)?;
                cursor = argument.next_sibling();
            }
            if node.closing_mark_inferred() {
                Ok(())
            } else {
                f.write_str("}}")
            }
        }
        NodeKind::TemplateArgument(a) => {
            if a.name.get().is_some() {
                emit_slot(&a.name, f)?;
                f.write_char('=')?;
            }
            emit_slot(&a.value, f)
        }
        NodeKind::ArgumentReference(a) => {
            f.write_str("{{{")?;
            emit_slot(&a.name, f)?;
            if a.default.get().is_some() {
                f.write_char('|')?;
                emit_slot(&a.default, f)?;
            }
            let mut cursor = a.rest.core().head();
            while let Some(segment) = cursor {
                f.write_char('|')?;
                emit(&segment, f)?;
                cursor = segment.next_sibling();
            }
            if node.closing_mark_inferred() {
                Ok(())
            } else {
                f.write_str("}}}")
            }
        }
        NodeKind::Tag(t) => {
            f.write_char('<')?;
            f.write_str(&t.name.borrow())?;
            emit_list(t.attributes.core(), f)?;
            f.write_str(&t.before_close.borrow())?;
            match t.style.get() {
                TagStyle::SelfClosing => return f.write_str("/>"),
                TagStyle::Unterminated => return Ok(()),
                TagStyle::Closed | TagStyle::Void | TagStyle::NotClosed => {
                    f.write_char('>')?;
                }
            }
            if let Some(raw) = t.raw_content.borrow().as_deref() {
                f.write_str(raw)?;
            }
            emit_slot(&t.content, f)?;
            if let Some(closing) = t.closing.borrow().as_deref() {
                f.write_str(closing)?;
            }
            Ok(())
        }
        NodeKind::TagAttribute(a) => {
            f.write_str(&a.leading.borrow())?;
            f.write_str(&a.name.borrow())?;
            if a.value.get().is_some() {
                f.write_str(&a.before_eq.borrow())?;
                f.write_char('=')?;
                f.write_str(&a.after_eq.borrow())?;
                f.write_str(a.quote.get().mark())?;
                emit_slot(&a.value, f)?;
                f.write_str(a.quote.get().mark())?;
            }
            Ok(())
        }
        NodeKind::Comment(c) => {
            f.write_str("<!--")?;
            f.write_str(&c.text.borrow())?;
            if c.closed.get() {
                f.write_str("-->")?;
            }
            Ok(())
        }
    }
}
