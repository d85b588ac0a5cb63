//! Facade behavior: cancellation, configuration handling, diagnostics, and
//! the helpers.

use super::parse;
use crate::{
    CancelToken, LogSink, Options, ParseError, TraceSink, WikitextParser, normalize_argument_name,
    normalize_title, text_content,
};
use std::cell::RefCell;
use std::sync::Arc;

#[test]
fn a_pending_cancellation_aborts_before_any_work() {
    let token = CancelToken::new();
    token.cancel();
    let parser = WikitextParser::default();
    let result = parser.parse_with("some text", None, Some(&token));
    assert_eq!(result.unwrap_err(), ParseError::Cancelled);
}

#[test]
fn an_unset_token_does_not_interfere() {
    let token = CancelToken::new();
    let parser = WikitextParser::default();
    let doc = parser.parse_with("some text", None, Some(&token)).unwrap();
    assert_eq!(doc.to_string(), "some text");
}

#[test]
fn bad_configuration_is_a_usage_error() {
    let parser = WikitextParser::new(Options {
        parser_tags: Some(vec!["bad name".to_string()]),
        ..Options::default()
    });
    assert!(matches!(parser.parse("x"), Err(ParseError::Usage(_))));
}

#[test]
fn mutating_options_refreezes_the_snapshot() {
    let mut parser = WikitextParser::default();
    let doc = parser.parse("<ref>{{x}}</ref>").unwrap();
    assert!(!doc.descendants().any(|n| n.kind().as_template().is_some()));

    // Dropping `ref` from the parser tag set turns its body into wikitext.
    parser.options_mut().parser_tags = Some(vec!["nowiki".to_string()]);
    let doc = parser.parse("<ref>{{x}}</ref>").unwrap();
    assert!(doc.descendants().any(|n| n.kind().as_template().is_some()));
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
}

impl TraceSink for Recorder {
    fn parse_started(&self, _text: &str) {
        self.events.borrow_mut().push("start".to_string());
    }
    fn parse_finished(&self) {
        self.events.borrow_mut().push("finish".to_string());
    }
    fn fallback(&self, offset: usize, depth: usize) {
        self.events.borrow_mut().push(format!("fallback {offset} {depth}"));
    }
}

#[test]
fn trace_events_bracket_the_parse_and_report_fallbacks() {
    let recorder = Recorder::default();
    let parser = WikitextParser::default();
    // The five-equals heading requires several abandoned level attempts.
    parser.parse_with("=====", Some(&recorder), None).unwrap();

    let events = recorder.events.borrow();
    assert_eq!(events.first().map(String::as_str), Some("start"));
    assert_eq!(events.last().map(String::as_str), Some("finish"));
    assert!(events.iter().any(|e| e.starts_with("fallback")));
}

#[test]
fn the_log_sink_is_harmless() {
    let parser = WikitextParser::default();
    let doc = parser.parse_with("a {{b}} c", Some(&LogSink), None).unwrap();
    assert_eq!(doc.to_string(), "a {{b}} c");
}

#[test]
fn one_facade_may_parse_from_many_threads() {
    let parser = Arc::new(WikitextParser::default());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            let parser = Arc::clone(&parser);
            scope.spawn(move || {
                for _ in 0..16 {
                    let doc = parser.parse("== h ==\n{{T|a=1}} and [[x]]").unwrap();
                    assert_eq!(doc.to_string(), "== h ==\n{{T|a=1}} and [[x]]");
                }
            });
        }
    });
}

#[test]
fn normalization_is_idempotent() {
    let normalized = normalize_title("  Foo   Bar_baz ");
    assert_eq!(normalized, "Foo Bar baz");
    assert_eq!(normalize_title(&normalized), normalized);

    let name = normalize_argument_name(" a ");
    assert_eq!(name, "a");
    assert_eq!(normalize_argument_name(&name), name);
}

#[test]
fn plain_text_extraction_skips_markup() {
    let doc = parse("== t ==\n''styled'' [[a|shown]] <!-- hidden --> {{tpl}}");
    let text = text_content(&doc);
    assert!(text.contains(" t "));
    assert!(text.contains("styled"));
    assert!(text.contains("shown"));
    assert!(!text.contains("hidden"));
    assert!(!text.contains("tpl"));
    assert!(!text.contains("=="));
}

#[test]
fn spans_are_recorded_on_request() {
    let options = Options {
        with_line_info: true,
        ..Options::default()
    };
    let parser = WikitextParser::new(options);
    let doc = parser.parse("ab\ncd").unwrap();

    let span = doc.span().unwrap();
    assert_eq!((span.start.line, span.start.column), (1, 1));
    assert_eq!((span.end.line, span.end.column), (2, 3));

    for node in doc.descendants() {
        let span = node.span().expect("every node carries a span");
        assert!(span.start <= span.end);
    }

    // Without the option no spans are recorded.
    let parser = WikitextParser::default();
    let doc = parser.parse("ab\ncd").unwrap();
    assert!(doc.span().is_none());
}
