//! The grammar rules.
//!
//! One mutually recursive procedure per production, all built on the same
//! protocol: open exactly one context frame on entry, resolve it with
//! exactly one `accept_*` or `reject` on every exit path. A rule returning
//! `None` signals a grammar mismatch that was already rolled back; callers
//! try the next alternative, and in the worst case free text consumes one
//! character and retries. Wikitext has no invalid input, so the document
//! rule itself can only fail through cancellation.

use super::context::ContextStack;
use super::terminator::TerminatorCache;
use super::{CancelToken, ParseError};
use crate::codemap::{LineCol, Span};
use crate::config::Snapshot;
use crate::trace::TraceSink;
use crate::tree::{
    ArgumentReference, AttributeQuote, CellKind, Comment, Document, ExternalLink, FormatSwitch,
    Heading, HorizontalRule, ListItem, Node, NodeCollection, Paragraph, PlainText, Run, SwitchKind,
    Table, TableCell, TableRow, Tag, TagAttribute, TagStyle, Template, TemplateArgument, WikiLink,
    classes,
};

/// Terminator for productions nested in a template: `}}` closes it, `|`
/// separates arguments. Masks all outer terminators.
const TEMPLATE_STOPS: &str = r"\}\}|\|";
/// Terminator for productions nested in an argument reference.
const ARGUMENT_REF_STOPS: &str = r"\}\}\}|\|";
/// Terminator for a wikilink scope. A nested `[[` is a stop so that link
/// nesting fails the outer link instead of parsing.
const WIKILINK_STOPS: &str = r"\[\[|\]\]";
/// Extra terminator for a wikilink target, which ends at the first pipe.
const PIPE_STOP: &str = r"\|";
/// Terminator for a template argument name, which ends at the first
/// top-level equals sign.
const EQUALS_STOP: &str = "=";
/// Terminator for a magic word name, which may end at a colon.
const COLON_STOP: &str = ":";
/// Terminator for a bracketed external link scope.
const EXTERNAL_LINK_STOPS: &str = r"\]";
/// Extra terminator for an external link target, which ends at whitespace.
const EXTERNAL_TARGET_STOPS: &str = "[ \t]";
/// Inline cell separator in a table data or caption cell.
const TABLE_DATA_STOPS: &str = r"\|\|";
/// Inline cell separators in a table header cell.
const TABLE_HEADER_STOPS: &str = r"\|\||!!";
/// Terminator for an unquoted tag attribute value.
const UNQUOTED_VALUE_STOPS: &str = "[ \t\n>]|/>";

/// The parse state for one logical parse.
pub(super) struct Parser<'a> {
    text: &'a str,
    cursor: LineCol,
    stack: ContextStack,
    terminators: &'a mut TerminatorCache,
    snapshot: &'a Snapshot,
    trace: Option<&'a dyn TraceSink>,
    cancel: Option<&'a CancelToken>,
    aborted: bool,
    /// Non-zero while parsing a scope that must not autolink (a bracketed
    /// external link target is one link already).
    no_autolink: u32,
}

impl<'a> Parser<'a> {
    pub(super) fn new(
        text: &'a str,
        snapshot: &'a Snapshot,
        terminators: &'a mut TerminatorCache,
        trace: Option<&'a dyn TraceSink>,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            text,
            cursor: LineCol::START,
            stack: ContextStack::default(),
            terminators,
            snapshot,
            trace,
            cancel,
            aborted: false,
            no_autolink: 0,
        }
    }

    pub(super) fn aborted(&self) -> bool {
        self.aborted
    }

    /// Verifies the engine's own guarantees after a successful parse.
    pub(super) fn check_invariants(&self) -> Result<(), ParseError> {
        if self.cursor.offset != self.text.len() {
            return Err(ParseError::Invariant(format!(
                "input not fully consumed, stopped at offset {} of {}",
                self.cursor.offset,
                self.text.len(),
            )));
        }
        if !self.stack.is_empty() {
            return Err(ParseError::Invariant(format!(
                "{} parse attempts left open",
                self.stack.depth(),
            )));
        }
        Ok(())
    }

    //
    // Cursor primitives
    //

    fn rest(&self) -> &'a str {
        &self.text[self.cursor.offset..]
    }

    fn eof(&self) -> bool {
        self.cursor.offset >= self.text.len()
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.cursor.offset).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn at_line_start(&self) -> bool {
        self.cursor.column == 1
    }

    /// Advances over `bytes` bytes, which must end on a character boundary.
    fn advance(&mut self, bytes: usize) {
        let consumed = &self.text[self.cursor.offset..self.cursor.offset + bytes];
        self.cursor.advance(consumed);
    }

    fn try_consume(&mut self, token: &str) -> bool {
        if self.starts_with(token) {
            self.advance(token.len());
            true
        } else {
            false
        }
    }

    /// The byte length of the run of `test`-matching characters at the
    /// cursor.
    fn measure_while(&self, test: impl Fn(u8) -> bool) -> usize {
        self.rest().bytes().take_while(|b| test(*b)).count()
    }

    //
    // The context frame protocol
    //

    fn push(&mut self, terminator: Option<&str>, overrides_outer: bool) {
        let terminator = terminator.map(|pattern| self.terminators.get(pattern));
        self.stack.push(self.cursor, terminator, overrides_outer);
    }

    /// Resolves the innermost attempt, keeping all consumed input.
    fn accept(&mut self) {
        self.stack.accept();
    }

    /// Resolves the innermost attempt and returns `node`, stamping its
    /// source span when line tracking was requested.
    fn accept_node(&mut self, node: Node) -> Option<Node> {
        let frame = self.stack.accept();
        if self.snapshot.with_line_info {
            node.set_span(Span::new(frame.origin, self.cursor));
        }
        Some(node)
    }

    /// Rolls the cursor back to the innermost attempt's origin and signals
    /// grammar mismatch to the caller.
    fn reject<T>(&mut self) -> Option<T> {
        let frame = self.stack.fallback();
        self.cursor = frame.origin;
        if let Some(trace) = self.trace {
            trace.fallback(self.cursor.offset, self.stack.depth());
        }
        None
    }

    fn needs_terminate(&self) -> bool {
        self.stack.needs_terminate(self.text, self.cursor.offset)
    }

    fn needs_terminate_at(&self, offset: usize) -> bool {
        offset >= self.text.len() || self.stack.needs_terminate(self.text, offset)
    }

    fn note_span(&self, node: &Node, start: LineCol) {
        if self.snapshot.with_line_info {
            node.set_span(Span::new(start, self.cursor));
        }
    }

    fn extend_span(&self, node: &Node) {
        if self.snapshot.with_line_info
            && let Some(span) = node.span()
        {
            node.set_span(Span::new(span.start, self.cursor));
        }
    }

    fn check_cancelled(&mut self) {
        if !self.aborted && self.cancel.is_some_and(CancelToken::is_cancelled) {
            self.aborted = true;
        }
    }

    //
    // Text accumulation
    //

    /// Appends `literal` to the inline list, merging into a trailing plain
    /// text node when possible.
    fn append_literal(&self, inlines: &NodeCollection<classes::Inline>, literal: &str) {
        if literal.is_empty() {
            return;
        }
        if let Some(last) = inlines.last()
            && let Some(text) = last.kind().as_plain_text()
        {
            text.push_str(literal);
            self.extend_span(&last);
            return;
        }
        inlines.append(PlainText::new(literal));
    }

    /// Appends the source range `start..cursor` as plain text.
    fn append_text_since(&self, inlines: &NodeCollection<classes::Inline>, start: LineCol) {
        let slice = &self.text[start.offset..self.cursor.offset];
        if slice.is_empty() {
            return;
        }
        if let Some(last) = inlines.last()
            && let Some(text) = last.kind().as_plain_text()
        {
            text.push_str(slice);
            self.extend_span(&last);
            return;
        }
        let node = PlainText::new(slice);
        self.note_span(&node, start);
        inlines.append(node);
    }

    //
    // Document flow
    //

    /// The document production: a sequence of lines. An empty document is
    /// valid and has no lines. This is also the cancellation checkpoint.
    pub(super) fn document(&mut self) -> Option<Node> {
        self.push(None, false);
        self.check_cancelled();
        if self.aborted {
            return self.reject();
        }
        let doc = Document::new();
        self.document_into(&doc);
        if self.aborted {
            return self.reject();
        }
        self.accept_node(doc)
    }

    /// Continues parsing lines into an existing document node. Used both by
    /// [`Self::document`] and to resume a template name after a non-magic
    /// colon.
    fn document_into(&mut self, doc: &Node) {
        let lines = match doc.kind().as_document() {
            Some(document) => document.lines(),
            None => return,
        };
        let mut last = lines.last();
        // True when a line break was consumed after an open paragraph but is
        // not stored anywhere yet: the next merged line accounts for it, and
        // any other outcome closes the paragraph with it.
        let mut pending_break = false;

        loop {
            if self.aborted || self.eof() || self.needs_terminate() {
                break;
            }

            // Line dispatch: list item, heading, horizontal rule and table
            // are anchored to the start of a line; the paragraph catch-all
            // always succeeds.
            let mut new_line = None;
            if self.at_line_start() {
                new_line = self
                    .list_item()
                    .or_else(|| self.heading())
                    .or_else(|| self.horizontal_rule())
                    .or_else(|| self.table());
            }

            if let Some(node) = new_line {
                // A structurally different line follows: the open paragraph
                // closes, taking the separating break with it if one is
                // still pending.
                if let Some(last) = &last
                    && let Some(paragraph) = last.kind().as_paragraph()
                    && !paragraph.is_closed()
                {
                    if pending_break {
                        self.append_literal(paragraph.inlines(), "\n");
                    }
                    paragraph.set_closed(true);
                    self.extend_span(last);
                }
                pending_break = false;
                lines.append(node.clone());
                last = Some(node);
            } else {
                // Paragraph path: merge into an open paragraph, otherwise
                // open a new one.
                let merge = last
                    .as_ref()
                    .filter(|l| l.kind().as_paragraph().is_some_and(|p| !p.is_closed()));
                match merge {
                    Some(open) => {
                        let paragraph = open.kind().as_paragraph().expect("checked above");
                        if pending_break {
                            self.append_literal(paragraph.inlines(), "\n");
                            pending_break = false;
                        }
                        self.run_into(paragraph.inlines());
                        self.extend_span(open);
                    }
                    None => {
                        let node = self.paragraph().expect("paragraph always matches");
                        lines.append(node.clone());
                        last = Some(node);
                        pending_break = false;
                    }
                }
            }

            match self.line_end(lines, &mut last) {
                LineEnd::Stop => break,
                LineEnd::Continue { pending } => pending_break = pending,
            }
        }
    }

    /// Consumes the break at the end of a line and applies the paragraph
    /// closing policy: a second consecutive break (or end of input, or an
    /// enclosing terminator) closes the open paragraph; two consecutive
    /// breaks additionally start a distinct empty paragraph in its place.
    fn line_end(
        &mut self,
        lines: &NodeCollection<classes::Line>,
        last: &mut Option<Node>,
    ) -> LineEnd {
        if self.eof() || self.needs_terminate() {
            return LineEnd::Stop;
        }
        if !self.starts_with("\n") {
            // A block construct ended in the middle of a line; the rest of
            // the line continues as a fresh line node.
            return LineEnd::Continue { pending: false };
        }

        let open = last
            .as_ref()
            .filter(|l| l.kind().as_paragraph().is_some_and(|p| !p.is_closed()))
            .cloned();

        self.advance(1);

        let Some(open) = open else {
            // The break trails a non-paragraph line (or a closed paragraph);
            // it belongs to that node.
            match last {
                Some(node) => self.append_line_break(node),
                None => {
                    // Defensive: a break with no preceding line becomes an
                    // empty closed paragraph holding it.
                    let node = Paragraph::new();
                    if let Some(paragraph) = node.kind().as_paragraph() {
                        self.append_literal(paragraph.inlines(), "\n");
                        paragraph.set_closed(true);
                    }
                    lines.append(node.clone());
                    *last = Some(node);
                }
            }
            return LineEnd::Continue { pending: false };
        };

        let paragraph = open.kind().as_paragraph().expect("checked above");
        if self.eof() || self.needs_terminate() {
            // The line break is the last thing in this scope; it closes the
            // paragraph and is stored in it.
            self.append_literal(paragraph.inlines(), "\n");
            paragraph.set_closed(true);
            self.extend_span(&open);
            return LineEnd::Continue { pending: false };
        }
        if self.starts_with("\n") {
            // Two consecutive breaks: close the paragraph with the first and
            // start a distinct empty paragraph holding the second. When the
            // second break is directly followed by a terminator (or end of
            // input), the empty paragraph is closed as well.
            self.append_literal(paragraph.inlines(), "\n");
            paragraph.set_closed(true);
            self.extend_span(&open);

            let start = self.cursor;
            self.advance(1);
            let node = Paragraph::new();
            if let Some(next) = node.kind().as_paragraph() {
                self.append_literal(next.inlines(), "\n");
                if self.eof() || self.needs_terminate() {
                    next.set_closed(true);
                }
            }
            self.note_span(&node, start);
            lines.append(node.clone());
            *last = Some(node);
            return LineEnd::Continue { pending: false };
        }
        // A single break with more content following: the paragraph stays
        // open, and the break is accounted for by whatever comes next.
        LineEnd::Continue { pending: true }
    }

    /// Stores a trailing line break on a non-paragraph line node.
    fn append_line_break(&self, node: &Node) {
        let kind = node.kind();
        if let Some(heading) = kind.as_heading() {
            heading.push_trailing("\n");
        } else if let Some(item) = kind.as_list_item() {
            self.append_literal(item.inlines(), "\n");
        } else if let Some(rule) = kind.as_horizontal_rule() {
            self.append_literal(rule.inlines(), "\n");
        } else if let Some(table) = kind.as_table() {
            table.push_trailing("\n");
        } else if let Some(paragraph) = kind.as_paragraph() {
            self.append_literal(paragraph.inlines(), "\n");
        }
        self.extend_span(node);
    }

    //
    // Line productions
    //

    /// The paragraph catch-all. Never fails; an empty line yields an empty
    /// open paragraph.
    fn paragraph(&mut self) -> Option<Node> {
        self.push(None, false);
        let node = Paragraph::new();
        if let Some(paragraph) = node.kind().as_paragraph() {
            self.run_into(paragraph.inlines());
        }
        self.accept_node(node)
    }

    /// A list item (or space-indented preformatted line), only at the start
    /// of a line.
    fn list_item(&mut self) -> Option<Node> {
        self.push(None, false);
        let prefix_len = self.measure_while(|b| matches!(b, b'*' | b'#' | b':' | b';'));
        let prefix_len = if prefix_len > 0 {
            prefix_len
        } else if self.peek() == Some(b' ') {
            1
        } else {
            return self.reject();
        };
        let prefix = &self.rest()[..prefix_len];
        let node = ListItem::new(prefix);
        self.advance(prefix_len);
        if let Some(item) = node.kind().as_list_item() {
            self.run_into(item.inlines());
        }
        self.accept_node(node)
    }

    /// A horizontal rule: four or more dashes, then whatever else shares the
    /// line.
    fn horizontal_rule(&mut self) -> Option<Node> {
        self.push(None, false);
        let dashes = self.measure_while(|b| b == b'-');
        if dashes < 4 {
            return self.reject();
        }
        self.advance(dashes);
        let node = HorizontalRule::new(dashes as u32);
        if let Some(rule) = node.kind().as_horizontal_rule() {
            self.run_into(rule.inlines());
        }
        self.accept_node(node)
    }

    /// A heading. The `=` run at the line start caps the candidate level;
    /// levels are tried from that maximum down to 1 and the first level
    /// whose closing run lines up wins.
    fn heading(&mut self) -> Option<Node> {
        let max = self.measure_while(|b| b == b'=').min(6);
        for level in (1..=max as u8).rev() {
            if let Some(node) = self.heading_attempt(level) {
                return Some(node);
            }
        }
        None
    }

    /// One candidate heading level: inline segments terminated by exactly
    /// `level` equals signs not followed by another. When the closing run
    /// turns out to be interior (more content follows on the line), it is
    /// re-inserted as literal text and the segment loop continues.
    fn heading_attempt(&mut self, level: u8) -> Option<Node> {
        let bar = "=".repeat(usize::from(level));
        let pattern = format!("={{{level}}}(?!=)");
        self.push(Some(&pattern), false);
        if !self.try_consume(&bar) {
            return self.reject();
        }
        let node = Heading::new(level);
        let heading = node.kind().as_heading().expect("just built");
        loop {
            if self.aborted {
                return self.reject();
            }
            let segment = Run::new();
            if let Some(run) = segment.kind().as_run() {
                self.run_into(run.inlines());
                if !self.try_consume(&bar) {
                    // Hit the end of the line (or an enclosing terminator)
                    // without a closing run; this level does not parse.
                    return self.reject();
                }
                heading.inlines().absorb(run.inlines());
            }

            // The heading ends here only if the rest of the line is
            // whitespace; otherwise the consumed run was interior. A
            // further `=` is always interior — it belongs to a later
            // closing candidate, never to an enclosing terminator.
            let ws = self.measure_while(|b| b == b' ' || b == b'\t');
            let after = self.cursor.offset + ws;
            let ends_here = match self.text.as_bytes().get(after).copied() {
                None | Some(b'\n') => true,
                Some(b'=') => false,
                Some(_) => self.needs_terminate_at(after),
            };
            if ends_here {
                if heading.inlines().is_empty() {
                    return self.reject();
                }
                let trailing = &self.rest()[..ws];
                heading.push_trailing(trailing);
                self.advance(ws);
                return self.accept_node(node);
            }
            self.append_literal(heading.inlines(), &bar);
        }
    }

    //
    // Free text flow
    //

    /// Parses inline content into `inlines` until a terminator, the end of
    /// the line, or the end of input. Failed construct starters degrade to
    /// one character of plain text, which is what makes every input parse.
    fn run_into(&mut self, inlines: &NodeCollection<classes::Inline>) {
        loop {
            if self.aborted || self.eof() || self.needs_terminate() {
                return;
            }
            let byte = match self.peek() {
                Some(b) => b,
                None => return,
            };
            if byte == b'\n' {
                return;
            }

            let item = match byte {
                b'{' => self.braces(),
                b'[' => self.bracket(),
                b'<' => self.angle(),
                b'\'' => self.quotes(),
                _ => None,
            };
            if let Some(item) = item {
                inlines.append(item);
                continue;
            }
            if matches!(byte, b'{' | b'[' | b'<' | b'\'') {
                // The construct did not parse: one character becomes text
                // and the rest retries, which resolves e.g. the four-brace
                // ambiguity by letting the first brace be ordinary text.
                let start = self.cursor;
                self.advance(1);
                self.append_text_since(inlines, start);
                continue;
            }

            if byte.is_ascii_alphabetic() && self.no_autolink == 0 && self.at_url_boundary() {
                if let Some(link) = self.autolink() {
                    inlines.append(link);
                    continue;
                }
                // Not a URL after all; consume one character so the scan
                // below cannot re-trip on the same protocol match.
                let start = self.cursor;
                self.advance(1);
                self.append_text_since(inlines, start);
                continue;
            }

            // Plain text: consume up to the nearest terminator, the next
            // construct starter, or a potential URL start.
            let limit = self
                .stack
                .nearest_stop(self.text, self.cursor.offset, self.trace);
            let chunk = &self.text[self.cursor.offset..limit];
            let mut stop = chunk.len();
            if let Some(found) = memchr::memchr3(b'{', b'[', b'<', chunk.as_bytes()) {
                stop = stop.min(found);
            }
            if let Some(found) = memchr::memchr2(b'\'', b'\n', chunk.as_bytes()) {
                stop = stop.min(found);
            }
            if let Some(found) = find_url_start(&chunk[..stop]) {
                stop = stop.min(found);
            }
            debug_assert!(stop > 0, "free text failed to make progress");
            let start = self.cursor;
            self.advance(stop.max(1));
            self.append_text_since(inlines, start);
        }
    }

    /// Returns true if an autolink may start here: the preceding character
    /// must not be alphanumeric.
    fn at_url_boundary(&self) -> bool {
        self.text[..self.cursor.offset]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_ascii_alphanumeric())
    }

    /// A bare URL, matched conservatively against the configured protocol
    /// set. The target of a bare link is plain text only.
    fn autolink(&mut self) -> Option<Node> {
        let Some(protocol) = self.snapshot.match_protocol(self.rest()) else {
            return None;
        };
        self.push(None, false);
        let body = self.rest()[protocol.len()..]
            .bytes()
            .take_while(|b| !b" \t\n<>[]{}|\"'".contains(b))
            .count();
        let mut url_len = protocol.len() + body;
        // Trailing punctuation reads as prose, not as part of the URL.
        while url_len > protocol.len()
            && matches!(
                self.rest().as_bytes()[url_len - 1],
                b',' | b'.' | b';' | b':' | b'!' | b'?' | b')'
            )
        {
            url_len -= 1;
        }
        if url_len == protocol.len() {
            return self.reject();
        }
        let target = Run::new();
        let start = self.cursor;
        self.advance(url_len);
        if let Some(run) = target.kind().as_run() {
            self.append_text_since(run.inlines(), start);
        }
        self.note_span(&target, start);
        self.accept_node(ExternalLink::new(target, None, false))
    }

    //
    // Brace constructs
    //

    /// Classifies a run of braces before committing to a construct:
    ///
    /// * fewer than 2 — plain text;
    /// * 2 — template;
    /// * 3 — argument reference;
    /// * 4 — deliberately unresolved: the first brace decays to text and the
    ///   remaining three retry (the known four-brace ambiguity);
    /// * 5 — a template inside a triple brace first, then a template whose
    ///   name starts with a triple brace;
    /// * more than 5 — the whole run is literal text with no structure.
    fn braces(&mut self) -> Option<Node> {
        let braces = self.measure_while(|b| b == b'{');
        match braces {
            0 | 1 | 4 => None,
            2 => self.template(),
            3 => self.argument_reference(),
            5 => self
                .argument_reference()
                .or_else(|| self.template()),
            _ => {
                self.push(None, false);
                let start = self.cursor;
                self.advance(braces);
                let node = PlainText::new(&self.text[start.offset..self.cursor.offset]);
                self.accept_node(node)
            }
        }
    }

    /// A template, `{{name|arg|…}}`, or a magic word `{{name:arg|…}}`.
    fn template(&mut self) -> Option<Node> {
        self.push(Some(TEMPLATE_STOPS), true);
        if !self.try_consume("{{") {
            return self.reject();
        }

        // The name may end at a colon when it is a magic word; a colon after
        // any other name is part of the name.
        self.push(Some(COLON_STOP), false);
        let Some(name) = self.document() else {
            self.reject::<()>();
            return self.reject();
        };
        loop {
            if !self.starts_with(":") || self.aborted {
                break;
            }
            if self.snapshot.is_magic_word(name.to_string().trim()) {
                break;
            }
            self.advance(1);
            append_to_last_paragraph(&name, ":");
            self.document_into(&name);
        }
        self.accept();

        let name_text = name.to_string();
        let magic = self.snapshot.is_magic_word(name_text.trim());
        if name_text.trim().is_empty() && !self.snapshot.allow_empty_template_name {
            return self.reject();
        }

        let node = Template::new(name);
        let template = node.kind().as_template().expect("just built");
        template.set_magic_word(magic);

        if magic && self.try_consume(":") {
            template.set_colon_argument(true);
            let argument = self.template_argument();
            template.arguments().append(argument);
        }
        while !self.aborted && self.try_consume("|") {
            let argument = self.template_argument();
            template.arguments().append(argument);
        }

        if self.try_consume("}}") {
            return self.accept_node(node);
        }
        if self.eof() && self.snapshot.allow_closing_mark_inference && !self.aborted {
            node.mark_closing_inferred();
            return self.accept_node(node);
        }
        self.reject()
    }

    /// One template argument: `name=value` when a top-level equals sign is
    /// present, positional otherwise. An equals sign inside a nested
    /// structure never splits the argument.
    fn template_argument(&mut self) -> Node {
        let start = self.cursor;
        self.push(Some(EQUALS_STOP), false);
        let first = self.document().unwrap_or_else(Document::new);
        let node = if self.try_consume("=") {
            self.accept();
            let value = self.document().unwrap_or_else(Document::new);
            TemplateArgument::new(Some(first), value)
        } else {
            self.accept();
            TemplateArgument::new(None, first)
        };
        self.note_span(&node, start);
        node
    }

    /// An argument reference, `{{{name|default}}}`. Segments after the
    /// default are parsed (they may contain nested structures that must be
    /// consumed) but carry no meaning.
    fn argument_reference(&mut self) -> Option<Node> {
        self.push(Some(ARGUMENT_REF_STOPS), true);
        if !self.try_consume("{{{") {
            return self.reject();
        }
        let Some(name) = self.document() else {
            return self.reject();
        };
        let default = if self.try_consume("|") {
            self.document()
        } else {
            None
        };
        let node = ArgumentReference::new(name, default);
        if let Some(reference) = node.kind().as_argument_reference() {
            while !self.aborted && self.try_consume("|") {
                if let Some(segment) = self.document() {
                    reference.surplus_segments().append(segment);
                }
            }
        }
        if self.try_consume("}}}") {
            return self.accept_node(node);
        }
        if self.eof() && self.snapshot.allow_closing_mark_inference && !self.aborted {
            node.mark_closing_inferred();
            return self.accept_node(node);
        }
        self.reject()
    }

    //
    // Links
    //

    fn bracket(&mut self) -> Option<Node> {
        if self.starts_with("[[") {
            self.wikilink()
        } else {
            self.external_link()
        }
    }

    /// An internal link, `[[target|text]]`. Another wikilink cannot nest
    /// inside the target or text scope.
    fn wikilink(&mut self) -> Option<Node> {
        self.push(Some(WIKILINK_STOPS), false);
        if !self.try_consume("[[") {
            return self.reject();
        }

        let target = Run::new();
        self.push(Some(PIPE_STOP), false);
        if let Some(run) = target.kind().as_run() {
            self.run_into(run.inlines());
        }
        self.accept();

        let target_text = target.to_string();
        if target_text.trim().is_empty() && !self.snapshot.allow_empty_wikilink_target {
            return self.reject();
        }

        let text = if self.try_consume("|") {
            let text = Run::new();
            if let Some(run) = text.kind().as_run() {
                self.run_into(run.inlines());
            }
            Some(text)
        } else {
            None
        };

        if !self.try_consume("]]") {
            return self.reject();
        }

        let node = WikiLink::new(target, text);
        if let Some(link) = node.kind().as_wiki_link()
            && let Some((namespace, _)) = target_text.split_once(':')
            && self.snapshot.is_image_namespace(namespace)
        {
            link.set_image(true);
        }
        self.accept_node(node)
    }

    /// A bracketed external link, `[target text]`. The target may contain
    /// expandable content but must carry a recognized protocol.
    fn external_link(&mut self) -> Option<Node> {
        self.push(Some(EXTERNAL_LINK_STOPS), false);
        if !self.try_consume("[") {
            return self.reject();
        }

        let target = Run::new();
        self.push(Some(EXTERNAL_TARGET_STOPS), false);
        self.no_autolink += 1;
        if let Some(run) = target.kind().as_run() {
            self.run_into(run.inlines());
        }
        self.no_autolink -= 1;
        self.accept();

        let target_text = target.to_string();
        let valid = match self.snapshot.match_protocol(&target_text) {
            Some(protocol) => target_text.len() > protocol.len(),
            None => target_text.starts_with("//") && target_text.len() > 2,
        };
        if !valid
            && !(target_text.is_empty() && self.snapshot.allow_empty_external_link_target)
        {
            return self.reject();
        }

        // The display text keeps its separating whitespace as content, so
        // nothing is lost between the target and the bracket.
        let text = Run::new();
        if let Some(run) = text.kind().as_run() {
            self.run_into(run.inlines());
        }
        let text = if text.children().next().is_some() {
            Some(text)
        } else {
            None
        };

        if !self.try_consume("]") {
            return self.reject();
        }
        self.accept_node(ExternalLink::new(target, text, true))
    }

    //
    // Formatting
    //

    /// A quote-run bold/italic switch. A run of exactly four quotes is not a
    /// switch; the caller consumes one quote as text and the remaining three
    /// parse as bold, matching the rendering engine.
    fn quotes(&mut self) -> Option<Node> {
        let quotes = self.measure_while(|b| b == b'\'');
        let switch = match quotes {
            2 => SwitchKind::Italic,
            3 => SwitchKind::Bold,
            5 => SwitchKind::BoldItalic,
            _ => return None,
        };
        self.push(None, false);
        self.advance(quotes);
        self.accept_node(FormatSwitch::new(switch))
    }

    //
    // Tags and comments
    //

    fn angle(&mut self) -> Option<Node> {
        if self.starts_with("<!--") {
            self.comment()
        } else {
            self.tag()
        }
    }

    /// An HTML comment. A missing `-->` is tolerated; the comment then runs
    /// to the end of input and is marked unterminated.
    fn comment(&mut self) -> Option<Node> {
        self.push(None, false);
        if !self.try_consume("<!--") {
            return self.reject();
        }
        let node = match self.rest().find("-->") {
            Some(at) => {
                let content = &self.rest()[..at];
                let node = Comment::new(content, true);
                self.advance(at + 3);
                node
            }
            None => {
                let content = self.rest();
                let node = Comment::new(content, false);
                self.advance(content.len());
                node
            }
        };
        self.accept_node(node)
    }

    /// An XML-like tag. Parser tags keep an opaque raw body; generic tags
    /// parse their body as wikitext up to the matching closing tag. A tag
    /// that never closes is kept best-effort with its closing mark inferred,
    /// when the configuration allows it.
    fn tag(&mut self) -> Option<Node> {
        self.push(None, false);
        if !self.try_consume("<") {
            return self.reject();
        }
        if !self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            return self.reject();
        }
        let name_len = self.measure_while(|b| b.is_ascii_alphanumeric() || b == b'-');
        let name = self.rest()[..name_len].to_string();
        self.advance(name_len);

        let node = Tag::new(&name, TagStyle::Closed);
        let tag = node.kind().as_tag().expect("just built");

        // Attributes, then the close of the opening tag.
        loop {
            if self.aborted {
                return self.reject();
            }
            let ws_len = self.measure_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
            let after = self.text.as_bytes().get(self.cursor.offset + ws_len).copied();
            match after {
                None | Some(b'>') | Some(b'/') => {
                    tag.set_before_close(self.rest()[..ws_len].to_string());
                    self.advance(ws_len);
                    break;
                }
                Some(_) => {
                    let leading = self.rest()[..ws_len].to_string();
                    self.advance(ws_len);
                    match self.tag_attribute(leading) {
                        Some(attribute) => {
                            tag.attributes().append(attribute);
                        }
                        None => return self.reject(),
                    }
                }
            }
        }

        if self.try_consume("/>") {
            tag.set_style(TagStyle::SelfClosing);
            return self.accept_node(node);
        }
        if !self.try_consume(">") {
            // The opening tag itself never ended.
            if self.eof() && self.snapshot.allow_closing_mark_inference {
                tag.set_style(TagStyle::Unterminated);
                node.mark_closing_inferred();
                return self.accept_node(node);
            }
            return self.reject();
        }
        if self.snapshot.is_self_closing_only_tag(&name) {
            tag.set_style(TagStyle::Void);
            return self.accept_node(node);
        }

        let close_pattern = format!("(?i)</{}[ \t]*>", regex::escape(&name));
        if self.snapshot.is_parser_tag(&name) {
            // Opaque raw body up to the case-insensitive closing tag.
            let close = self.terminators.get(&close_pattern);
            match close.find_from(self.text, self.cursor.offset) {
                Some(at) => {
                    let raw = self.text[self.cursor.offset..at].to_string();
                    self.advance(at - self.cursor.offset);
                    let len = close
                        .match_len_at(self.text, self.cursor.offset)
                        .unwrap_or(0);
                    tag.set_raw_content(raw);
                    tag.set_closing(self.rest()[..len].to_string());
                    self.advance(len);
                    tag.set_style(TagStyle::Closed);
                    self.accept_node(node)
                }
                None if self.snapshot.allow_closing_mark_inference => {
                    let raw = self.rest().to_string();
                    self.advance(raw.len());
                    tag.set_raw_content(raw);
                    tag.set_style(TagStyle::NotClosed);
                    node.mark_closing_inferred();
                    self.accept_node(node)
                }
                None => self.reject(),
            }
        } else if name.eq_ignore_ascii_case("li") {
            // A list item tag also ends at the next opening list item tag or
            // at the end of input; that is normal, not an error.
            let pattern = format!("{close_pattern}|(?i)<li[ \t\n/>]");
            self.push(Some(&pattern), false);
            let content = self.document();
            self.accept();
            if let Some(content) = content {
                tag.set_content(content);
            }
            let close = self.terminators.get(&close_pattern);
            match close.match_len_at(self.text, self.cursor.offset) {
                Some(len) => {
                    tag.set_closing(self.rest()[..len].to_string());
                    self.advance(len);
                    tag.set_style(TagStyle::Closed);
                }
                None => tag.set_style(TagStyle::NotClosed),
            }
            self.accept_node(node)
        } else {
            // Wikitext body. The closing pattern does not mask outer
            // terminators, so an unclosed tag ends at the nearest enclosing
            // closing tag instead of swallowing it.
            self.push(Some(&close_pattern), false);
            let content = self.document();
            self.accept();
            if let Some(content) = content {
                tag.set_content(content);
            }
            let close = self.terminators.get(&close_pattern);
            match close.match_len_at(self.text, self.cursor.offset) {
                Some(len) => {
                    tag.set_closing(self.rest()[..len].to_string());
                    self.advance(len);
                    tag.set_style(TagStyle::Closed);
                    self.accept_node(node)
                }
                None if self.snapshot.allow_closing_mark_inference => {
                    tag.set_style(TagStyle::NotClosed);
                    node.mark_closing_inferred();
                    self.accept_node(node)
                }
                None => self.reject(),
            }
        }
    }

    /// One tag attribute. The value's quote style is found by trial parse:
    /// single quotes, then double quotes, then unquoted.
    fn tag_attribute(&mut self, leading: String) -> Option<Node> {
        self.push(None, false);
        let name_len = self.measure_while(|b| !b" \t\n\r=/>".contains(&b));
        if name_len == 0 {
            return self.reject();
        }
        let name = self.rest()[..name_len].to_string();
        self.advance(name_len);

        // Only treat whitespace as pre-equals trivia when an equals sign
        // actually follows; otherwise it belongs to the next attribute.
        let ws_len = self.measure_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
        let has_value = self.text.as_bytes().get(self.cursor.offset + ws_len).copied() == Some(b'=');
        if !has_value {
            let node = TagAttribute::new(&name, None, AttributeQuote::Unquoted);
            if let Some(attribute) = node.kind().as_tag_attribute() {
                attribute.set_trivia(leading, String::new(), String::new());
            }
            return self.accept_node(node);
        }

        let before_eq = self.rest()[..ws_len].to_string();
        self.advance(ws_len + 1);
        let after_len = self.measure_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
        let after_eq = self.rest()[..after_len].to_string();
        self.advance(after_len);

        let (value, quote) = match self.quoted_value('\'') {
            Some(value) => (value, AttributeQuote::Single),
            None => match self.quoted_value('"') {
                Some(value) => (value, AttributeQuote::Double),
                None => {
                    let value = Run::new();
                    self.push(Some(UNQUOTED_VALUE_STOPS), false);
                    if let Some(run) = value.kind().as_run() {
                        self.run_into(run.inlines());
                    }
                    self.accept();
                    (value, AttributeQuote::Unquoted)
                }
            },
        };

        let node = TagAttribute::new(&name, Some(value), quote);
        if let Some(attribute) = node.kind().as_tag_attribute() {
            attribute.set_trivia(leading, before_eq, after_eq);
        }
        self.accept_node(node)
    }

    /// A quoted attribute value; fails if the closing quote never appears.
    fn quoted_value(&mut self, quote: char) -> Option<Node> {
        if self.peek() != Some(quote as u8) {
            return None;
        }
        let pattern = if quote == '\'' { "'" } else { "\"" };
        self.push(Some(pattern), false);
        self.advance(1);
        let value = Run::new();
        if let Some(run) = value.kind().as_run() {
            self.run_into(run.inlines());
        }
        if self.peek() == Some(quote as u8) {
            self.advance(1);
            self.accept();
            Some(value)
        } else {
            self.reject()
        }
    }

    //
    // Tables
    //

    /// A table, `{|` … `|}`, anchored to the start of a line. Cell content
    /// pushes its separators with `overrides_outer`, so inside a cell the
    /// cell's own separators take precedence over any enclosing terminator.
    fn table(&mut self) -> Option<Node> {
        self.push(None, true);
        if !self.try_consume("{|") {
            return self.reject();
        }

        let attrs = Run::new();
        if let Some(run) = attrs.kind().as_run() {
            self.run_into(run.inlines());
        }
        let node = Table::new(attrs);
        let table = node.kind().as_table().expect("just built");
        let mut current_row: Option<Node> = None;

        loop {
            if self.aborted {
                return self.reject();
            }
            if self.eof() {
                if self.snapshot.allow_closing_mark_inference {
                    node.mark_closing_inferred();
                    break;
                }
                return self.reject();
            }
            if !self.starts_with("\n") {
                // Nothing inside a table consumes a partial line; give up on
                // the whole construct rather than guessing.
                return self.reject();
            }

            if self.starts_with("\n|}") {
                self.advance(3);
                table.set_end("\n|}".to_string());
                break;
            }
            if self.starts_with("\n|-") {
                let start = self.cursor;
                self.advance(3);
                let dashes = self.measure_while(|b| b == b'-');
                self.advance(dashes);
                let leading = &self.text[start.offset..self.cursor.offset];
                let attrs = Run::new();
                if let Some(run) = attrs.kind().as_run() {
                    self.run_into(run.inlines());
                }
                let attrs = if attrs.children().next().is_some() {
                    Some(attrs)
                } else {
                    None
                };
                let row = TableRow::new(leading, attrs);
                self.note_span(&row, start);
                table.rows().append(row.clone());
                current_row = Some(row);
                continue;
            }

            // A cell line, or stray content, both of which live in a row.
            let row = match &current_row {
                Some(row) => row.clone(),
                None => {
                    let row = TableRow::new("", None);
                    table.rows().append(row.clone());
                    current_row = Some(row.clone());
                    row
                }
            };
            self.table_cells(&row);
        }
        self.accept_node(node)
    }

    /// Parses the cells introduced at the current line boundary into `row`.
    /// Stray lines that start with neither `|` nor `!` become an anonymous
    /// cell with an empty separator, so the table still round-trips.
    fn table_cells(&mut self, row: &Node) {
        let Some(row_data) = row.kind().as_table_row() else {
            return;
        };

        let (first, kind) = if self.starts_with("\n|+") {
            ("\n|+", CellKind::Caption)
        } else if self.starts_with("\n!") {
            ("\n!", CellKind::Header)
        } else if self.starts_with("\n|") {
            ("\n|", CellKind::Data)
        } else {
            ("", CellKind::Data)
        };

        let mut separator = first.to_string();
        self.advance(separator.len());

        loop {
            if self.aborted {
                return;
            }
            let start = self.cursor;
            let attrs = self.cell_attributes();
            let stops = match kind {
                CellKind::Header => TABLE_HEADER_STOPS,
                CellKind::Data | CellKind::Caption => TABLE_DATA_STOPS,
            };
            self.push(Some(stops), true);
            let content = Run::new();
            if let Some(run) = content.kind().as_run() {
                loop {
                    self.run_into(run.inlines());
                    if self.aborted || self.eof() || self.needs_terminate() {
                        break;
                    }
                    if self.starts_with("\n") {
                        // The cell continues across the break unless the
                        // next line introduces a table element.
                        let next = self.text.as_bytes().get(self.cursor.offset + 1).copied();
                        if matches!(next, Some(b'|') | Some(b'!')) {
                            break;
                        }
                        let line_start = self.cursor;
                        self.advance(1);
                        self.append_text_since(run.inlines(), line_start);
                        continue;
                    }
                    break;
                }
            }
            self.accept();

            let cell = TableCell::new(separator.clone(), kind, attrs, content);
            self.note_span(&cell, start);
            row_data.cells().append(cell);

            // Inline separators keep the role the line started with.
            if self.try_consume("||") {
                separator = "||".to_string();
            } else if kind == CellKind::Header && self.try_consume("!!") {
                separator = "!!".to_string();
            } else {
                return;
            }
        }
    }

    /// The optional attribute segment of a cell: content before a single
    /// (not doubled) pipe on the same line. Discovered by trial parse.
    fn cell_attributes(&mut self) -> Option<Node> {
        self.push(Some(PIPE_STOP), false);
        let attrs = Run::new();
        if let Some(run) = attrs.kind().as_run() {
            self.run_into(run.inlines());
        }
        if self.starts_with("|") && !self.starts_with("||") {
            self.advance(1);
            self.accept_node(attrs)
        } else {
            self.reject()
        }
    }
}

/// The outcome of consuming a line ending.
enum LineEnd {
    /// The document (or nested block) ends here.
    Stop,
    /// Parsing continues; `pending` is set when a consumed break is waiting
    /// to be stored by whatever the next line turns out to be.
    Continue { pending: bool },
}

/// Appends literal text to the last open paragraph of a document node,
/// creating one when needed. Used to keep a non-magic colon inside a
/// template name.
fn append_to_last_paragraph(doc: &Node, literal: &str) {
    let Some(document) = doc.kind().as_document() else {
        return;
    };
    if let Some(last) = document.lines().last()
        && let Some(paragraph) = last.kind().as_paragraph()
        && !paragraph.is_closed()
    {
        let tail = paragraph.inlines().last();
        match tail.as_ref().and_then(|t| t.kind().as_plain_text()) {
            Some(plain) => plain.push_str(literal),
            None => {
                paragraph.inlines().append(PlainText::new(literal));
            }
        }
        return;
    }
    let node = Paragraph::new();
    if let Some(paragraph) = node.kind().as_paragraph() {
        paragraph.inlines().append(PlainText::new(literal));
    }
    document.lines().append(node);
}

/// Finds a position inside `chunk` where a URL scheme might start: the
/// alphanumeric run preceding a `://`, when that run does not begin the
/// chunk (a run at the chunk start continues earlier text and is never a
/// link boundary).
fn find_url_start(chunk: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = chunk[from..].find("://") {
        let at = from + found;
        let mut start = at;
        while start > 0 && chunk.as_bytes()[start - 1].is_ascii_alphanumeric() {
            start -= 1;
        }
        if start > 0 && start < at {
            return Some(start);
        }
        from = at + 3;
    }
    None
}
