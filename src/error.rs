//! Error types shared across the heap and parser cores.

use thiserror::Error;

/// Errors surfaced by [`crate::vbh`] operations.
///
/// Precondition violations (bad indices, operating on an empty heap) are
/// programmer errors and panic via debug assertions rather than returning
/// a value here — this enum only covers the one genuine runtime failure
/// mode the heap can hit.
#[derive(Error, Debug)]
pub enum HeapError {
    /// Row or outer-array growth could not be satisfied.
    ///
    /// The global allocator aborts on OOM by default, so in practice this
    /// variant is reachable only behind an allocator that returns instead
    /// of aborting; it exists so callers embedding a custom allocator have
    /// somewhere to route the failure.
    #[error("heap allocation failed while growing to {requested_rows} rows")]
    AllocationFailed {
        /// Number of rows the heap was attempting to grow to.
        requested_rows: usize,
    },
}

/// A single parse diagnostic: a message plus a caret offset into the
/// offending token's source text.
///
/// There is exactly one user-visible failure mode for [`crate::vxp`]: a
/// syntax or semantic error with no recovery. `offset` is a byte offset
/// into the original query text, suitable for rendering a caret under the
/// offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Byte offset into the original input where the error was detected.
    pub offset: usize,
}

impl ParseError {
    /// Build a parse error at the given offset.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}
