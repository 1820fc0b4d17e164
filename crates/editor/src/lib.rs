//! Editor-side glue around the language server layer.
//!
//! [`Coordinator`] is the entry point: one per editor view. It owns the open
//! document's [`DocumentSync`](stride_lsp::DocumentSync), the completion
//! session, highlight scheduling and diagnostics, and reaches the shared
//! [`ProjectRegistry`] for quick open.

use std::path::PathBuf;

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod highlight;
pub mod project;

pub use config::{ConfigError, EditorConfig};
pub use coordinator::{Coordinator, CoordinatorEvent, PopoverEvent};
pub use diagnostics::DiagnosticsByLine;
pub use highlight::{HighlightError, HighlightSpan, Highlighter, ProcessHighlighter, Token};
pub use project::{IndexError, ProjectIndex, ProjectRegistry};

/// A convenient type alias for `Result` with `E` = [`EditorError`].
pub type Result<T, E = EditorError> = std::result::Result<T, E>;

/// Errors surfaced to the editor UI.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
	/// Reading or writing a file failed.
	#[error("{}: {source}", path.display())]
	Io {
		/// File path.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// The path cannot be expressed as a `file://` URI.
	#[error("invalid path: {}", .0.display())]
	InvalidPath(PathBuf),
	/// A server location is not a `file://` URI.
	#[error("not a file URI: {0}")]
	InvalidUri(String),
	/// The operation needs an open document.
	#[error("no document is open")]
	NotOpen,
	/// Configuration is invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A buffer edit was out of bounds.
	#[error(transparent)]
	Buffer(#[from] stride_primitives::BufferError),
	/// A project could not be indexed.
	#[error(transparent)]
	Index(#[from] IndexError),
}
