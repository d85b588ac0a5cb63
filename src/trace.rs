//! Diagnostic hooks for observing a parse in flight.
//!
//! A [`TraceSink`] is a write-only listener: the engine reports rule
//! fallbacks and terminator searches to it, and nothing it does can affect
//! the parse result. The default method bodies are all no-ops so a sink only
//! implements the events it cares about.

/// A listener for parser diagnostics.
pub trait TraceSink {
    /// Called once when a parse begins, with the full input text.
    fn parse_started(&self, _text: &str) {}

    /// Called once when a parse ends, on success and on failure.
    fn parse_finished(&self) {}

    /// Called whenever a grammar rule rolls back a speculative attempt.
    ///
    /// `offset` is the byte offset the cursor was restored to and `depth` is
    /// the number of attempts still open after the rollback.
    fn fallback(&self, _offset: usize, _depth: usize) {}

    /// Called before the engine searches for the nearest terminator match.
    fn terminator_search_started(&self, _offset: usize, _pattern: &str) {}

    /// Called after the engine finished a terminator search.
    fn terminator_search_finished(&self, _offset: usize, _pattern: &str) {}
}

/// A [`TraceSink`] that forwards every event to the [`log`] crate at trace
/// level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn parse_started(&self, text: &str) {
        log::trace!("parse started, {} bytes", text.len());
    }

    fn parse_finished(&self) {
        log::trace!("parse finished");
    }

    fn fallback(&self, offset: usize, depth: usize) {
        log::trace!("fallback to offset {offset}, {depth} attempts open");
    }

    fn terminator_search_started(&self, offset: usize, pattern: &str) {
        log::trace!("terminator search from {offset}: {pattern}");
    }

    fn terminator_search_finished(&self, offset: usize, pattern: &str) {
        log::trace!("terminator search done at {offset}: {pattern}");
    }
}
