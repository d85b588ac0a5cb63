//! The backtracking context stack.
//!
//! Every grammar rule opens exactly one parse attempt on entry and resolves
//! it exactly once: `accept` keeps everything the rule consumed, `fallback`
//! restores the recorded cursor so the caller can try the next alternative.
//! A frame optionally carries a terminator for the productions nested under
//! it; resolution scans the stack from the innermost frame outwards and
//! stops early at the first frame whose terminator set masks the outer ones.

use super::terminator::Terminator;
use crate::codemap::LineCol;
use crate::trace::TraceSink;
use std::sync::Arc;

/// One speculative parse attempt: a rollback point plus the terminator it
/// supplies to nested productions.
#[derive(Debug)]
pub(crate) struct Frame {
    /// The cursor recorded when the attempt was opened.
    pub origin: LineCol,
    /// The stop pattern nested productions must respect, if any.
    pub terminator: Option<Arc<Terminator>>,
    /// If true, this frame's terminator fully masks every outer frame —
    /// e.g. inside a table cell only the cell's own separators stop free
    /// text, not the line terminator of the enclosing production.
    pub overrides_outer: bool,
}

/// The stack of open parse attempts.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    /// Opens a parse attempt rooted at `origin`.
    pub fn push(&mut self, origin: LineCol, terminator: Option<Arc<Terminator>>, overrides_outer: bool) {
        self.frames.push(Frame {
            origin,
            terminator,
            overrides_outer,
        });
    }

    /// Closes the innermost attempt, keeping all consumed input.
    ///
    /// # Panics
    ///
    /// Panics if no attempt is open; that is a grammar-rule bug.
    pub fn accept(&mut self) -> Frame {
        self.frames.pop().expect("unbalanced context stack")
    }

    /// Closes the innermost attempt for rollback, returning the frame whose
    /// origin the cursor must be restored to.
    ///
    /// # Panics
    ///
    /// Panics if no attempt is open; that is a grammar-rule bug.
    pub fn fallback(&mut self) -> Frame {
        self.frames.pop().expect("unbalanced context stack")
    }

    /// The number of open attempts.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no attempt is open.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns true if the current production must stop at `offset`: either
    /// the input is exhausted or a consulted frame's terminator matches.
    pub fn needs_terminate(&self, text: &str, offset: usize) -> bool {
        if offset >= text.len() {
            return true;
        }
        for frame in self.frames.iter().rev() {
            if let Some(terminator) = &frame.terminator
                && terminator.matches_at(text, offset)
            {
                return true;
            }
            if frame.overrides_outer {
                break;
            }
        }
        false
    }

    /// The nearest offset at or after `offset` where a consulted frame's
    /// terminator matches, or the end of input. Free-text scanning uses this
    /// to bound how much plain text it may consume in one step.
    pub fn nearest_stop(
        &self,
        text: &str,
        offset: usize,
        trace: Option<&dyn TraceSink>,
    ) -> usize {
        let mut nearest = text.len();
        for frame in self.frames.iter().rev() {
            if let Some(terminator) = &frame.terminator {
                if let Some(trace) = trace {
                    trace.terminator_search_started(offset, terminator.source());
                }
                if let Some(found) = terminator.find_from(text, offset) {
                    nearest = nearest.min(found);
                }
                if let Some(trace) = trace {
                    trace.terminator_search_finished(offset, terminator.source());
                }
            }
            if frame.overrides_outer {
                break;
            }
        }
        nearest
    }
}
