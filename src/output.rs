//! Output accumulator.
//!
//! Raw output chunks from the execution service are escaped once, at append
//! time, and kept in arrival order until the next run clears them.
//!
//! The buffer is unbounded. A long-running program can grow it without
//! limit; the session clears it at the start of every run.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

// ============================================================================
// Escaping
// ============================================================================

/// Escapes characters the presentation layer would read as markup.
///
/// Only `<` is rewritten (to `&lt;`). Existing entities are left alone, so
/// escaping is not idempotent; callers escape exactly once.
#[must_use]
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    if text.contains('<') {
        Cow::Owned(text.replace('<', "&lt;"))
    } else {
        Cow::Borrowed(text)
    }
}

// ============================================================================
// OutputSink
// ============================================================================

/// Append-only buffer of escaped output chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSink {
    chunks: Vec<String>,
}

impl OutputSink {
    /// Creates an empty sink.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Escapes `text` and appends it as one chunk.
    ///
    /// Returns the escaped chunk as stored.
    pub fn append(&mut self, text: &str) -> &str {
        self.chunks.push(escape_markup(text).into_owned());
        self.chunks.last().map(String::as_str).unwrap_or_default()
    }

    /// Removes all chunks.
    #[inline]
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Returns the escaped chunks in arrival order.
    #[inline]
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Returns all chunks concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        self.chunks.concat()
    }

    /// Returns the number of chunks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no output is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the total size of the buffered text in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(String::len).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
