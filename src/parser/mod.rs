//! The parser facade.
//!
//! [`WikitextParser`] owns the caller's [`Options`], a lazily frozen
//! configuration snapshot, and a single-slot cache of reusable scratch state
//! (the compiled-terminator cache). One facade may be used from any number
//! of threads at once: each parse takes the cached engine out of the slot
//! with an atomic swap — at most one thread wins the cached one, every other
//! thread allocates a fresh engine — so concurrent parses never share
//! mutable state.

use crate::config::{Options, Snapshot};
use crate::trace::TraceSink;
use crate::tree::Node;
use arc_cell::ArcCell;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod context;
mod rules;
mod terminator;

use terminator::TerminatorCache;

/// An error from [`WikitextParser::parse`].
///
/// Malformed markup is never an error — every input string parses to some
/// tree. These variants only cover cancellation and programmer mistakes.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The parse was cancelled through its [`CancelToken`].
    #[error("parse was cancelled")]
    Cancelled,
    /// The supplied configuration is unusable.
    #[error("invalid parser configuration: {0}")]
    Usage(String),
    /// The engine violated one of its own guarantees — input was not fully
    /// consumed, or the attempt stack was left unbalanced. This indicates a
    /// bug in the grammar rules, not a problem with the input.
    #[error("parser invariant violated: {0}")]
    Invariant(String),
}

/// A cooperative cancellation token.
///
/// Cancellation is checked at coarse, well-defined points (document rule
/// entry), so a pending request aborts the parse promptly but never midway
/// through a production.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. All parses sharing this token will abort at
    /// their next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Reusable per-parse scratch state. Compiling terminator patterns is the
/// expensive part of starting a parse, so the compiled cache is kept.
#[derive(Debug, Default)]
struct Engine {
    terminators: TerminatorCache,
}

/// The lock-free single-slot engine cache.
struct EngineCache {
    slot: ArcCell<Option<Engine>>,
}

impl EngineCache {
    fn new() -> Self {
        Self {
            slot: ArcCell::new(Arc::new(None)),
        }
    }

    /// Takes the cached engine, if one is present and not concurrently
    /// observed by another thread.
    fn take(&self) -> Option<Engine> {
        let previous = self.slot.set(Arc::new(None));
        Arc::try_unwrap(previous).ok().flatten()
    }

    /// Parks an engine for the next parse to reuse.
    fn put(&self, engine: Engine) {
        self.slot.set(Arc::new(Some(engine)));
    }
}

/// A wikitext parser.
///
/// The facade is cheap to keep around and reusable; see the module
/// documentation for its concurrency behavior. The trees it produces carry
/// no concurrency contract of their own.
pub struct WikitextParser {
    options: Options,
    snapshot: OnceLock<Arc<Snapshot>>,
    engine: EngineCache,
}

impl Default for WikitextParser {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl WikitextParser {
    /// Creates a parser with the given options.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            snapshot: OnceLock::new(),
            engine: EngineCache::new(),
        }
    }

    /// The current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable access to the options. The frozen configuration snapshot is
    /// discarded and rebuilt on the next parse.
    pub fn options_mut(&mut self) -> &mut Options {
        self.snapshot = OnceLock::new();
        &mut self.options
    }

    fn frozen(&self) -> Result<Arc<Snapshot>, ParseError> {
        if let Some(snapshot) = self.snapshot.get() {
            return Ok(snapshot.clone());
        }
        let snapshot = Arc::new(Snapshot::freeze(&self.options)?);
        // Another thread may have frozen concurrently; both results are
        // equivalent, keep whichever landed first.
        let _ = self.snapshot.set(snapshot.clone());
        Ok(self.snapshot.get().cloned().unwrap_or(snapshot))
    }

    /// Parses `text` into a document tree.
    ///
    /// This never fails on malformed markup; in the worst case a construct
    /// degrades to plain text. Errors only report cancellation or
    /// programmer mistakes, see [`ParseError`].
    pub fn parse(&self, text: &str) -> Result<Node, ParseError> {
        self.parse_with(text, None, None)
    }

    /// Parses `text` with an optional diagnostic sink and cancellation
    /// token.
    pub fn parse_with(
        &self,
        text: &str,
        trace: Option<&dyn TraceSink>,
        cancel: Option<&CancelToken>,
    ) -> Result<Node, ParseError> {
        let snapshot = self.frozen()?;
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(ParseError::Cancelled);
        }

        let engine = self.engine.take().unwrap_or_default();
        let mut engine = scopeguard::guard(engine, |engine| self.engine.put(engine));
        if let Some(trace) = trace {
            trace.parse_started(text);
        }
        scopeguard::defer! {
            if let Some(trace) = trace {
                trace.parse_finished();
            }
        }
        log::debug!("parsing {} bytes of wikitext", text.len());

        let mut parser = rules::Parser::new(
            text,
            &snapshot,
            &mut engine.terminators,
            trace,
            cancel,
        );
        let root = parser.document();
        if parser.aborted() {
            return Err(ParseError::Cancelled);
        }
        let Some(root) = root else {
            return Err(ParseError::Invariant(
                "the document rule failed to produce a tree".to_string(),
            ));
        };
        parser.check_invariants()?;
        Ok(root)
    }
}
