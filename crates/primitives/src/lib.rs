//! Core types for text editing: buffers, edits and rope helpers.

/// Text buffer seam and a rope-backed implementation.
pub mod buffer;
/// Single insert/delete edits.
pub mod edit;
/// Rope utilities and extensions.
pub mod rope;

pub use buffer::{Buffer, BufferError, BufferObserver, TextBuffer};
pub use edit::Edit;
pub use ropey::{Rope, RopeSlice};
