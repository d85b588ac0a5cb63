//! Compiled lookahead patterns.
//!
//! A terminator answers two questions for the grammar rules: "must the
//! current production stop at this position?" and "where is the nearest
//! position it would have to stop at?". Patterns use `fancy-regex` because
//! several of them need lookahead (a heading's closing run is `={n}` *not*
//! followed by another `=`), which the plain `regex` engine cannot express.
//!
//! Compilation is the expensive part, so compiled terminators are cached by
//! pattern text and shared; the cache lives in the facade's reusable scratch
//! engine and survives across parses.

use std::collections::HashMap;
use std::sync::Arc;

/// A compiled terminator pattern.
#[derive(Debug)]
pub(crate) struct Terminator {
    source: Box<str>,
    /// The pattern anchored to the start of the remaining input, for "stop
    /// here?" queries.
    anchored: fancy_regex::Regex,
    /// The unanchored pattern, for nearest-match searches.
    search: fancy_regex::Regex,
}

impl Terminator {
    fn compile(pattern: &str) -> Self {
        let anchored = fancy_regex::Regex::new(&format!("^(?:{pattern})"))
            .expect("invalid terminator pattern");
        let search = fancy_regex::Regex::new(pattern).expect("invalid terminator pattern");
        Self {
            source: pattern.into(),
            anchored,
            search,
        }
    }

    /// The pattern text this terminator was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the pattern matches exactly at `offset`.
    ///
    /// The remaining input is matched as its own subject, which is sound
    /// because terminator patterns only ever look ahead.
    pub fn matches_at(&self, text: &str, offset: usize) -> bool {
        self.anchored.is_match(&text[offset..]).unwrap_or(false)
    }

    /// The length of the match at `offset`, if the pattern matches there.
    pub fn match_len_at(&self, text: &str, offset: usize) -> Option<usize> {
        self.anchored
            .find(&text[offset..])
            .ok()
            .flatten()
            .map(|m| m.end())
    }

    /// The start of the nearest match at or after `offset`, if any.
    pub fn find_from(&self, text: &str, offset: usize) -> Option<usize> {
        self.search
            .find(&text[offset..])
            .ok()
            .flatten()
            .map(|m| offset + m.start())
    }
}

/// A deduplicating cache of compiled terminators.
#[derive(Debug, Default)]
pub(crate) struct TerminatorCache {
    patterns: HashMap<Box<str>, Arc<Terminator>>,
}

impl TerminatorCache {
    /// Returns the compiled form of `pattern`, compiling it on first use.
    pub fn get(&mut self, pattern: &str) -> Arc<Terminator> {
        if let Some(terminator) = self.patterns.get(pattern) {
            return terminator.clone();
        }
        let terminator = Arc::new(Terminator::compile(pattern));
        self.patterns
            .insert(pattern.into(), terminator.clone());
        terminator
    }
}
