//! Document synchronization and completion lifecycle for a language server client.
//!
//! The crate sits between an editor buffer and a language server connection:
//!
//! - [`position`] translates char offsets to wire positions in the negotiated
//!   [`OffsetEncoding`].
//! - [`changes`] encodes buffer edits as `textDocument/didChange` content changes.
//! - [`sync::DocumentSync`] owns a document's version counter and chooses between
//!   incremental and throttled full synchronization.
//! - [`completion`] detects trigger positions, filters cached results and tracks the
//!   single in-flight completion request.
//!
//! Process management and JSON-RPC framing live behind the [`LspTransport`] trait;
//! this crate only speaks typed [`lsp_types`] values to it.
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Re-export of the [`lsp_types`] dependency of this crate.
pub use lsp_types;
use lsp_types::Uri;

pub mod capabilities;
pub mod changes;
pub mod client;
pub mod completion;
pub mod document;
pub mod position;
pub mod sync;

pub use capabilities::{NegotiatedCapabilities, SaveNotification, SyncMode};
pub use changes::encode_change;
pub use client::{ClientHandle, LspTransport, Notification, OffsetEncoding, RecordingTransport};
pub use document::DocumentState;
pub use position::{char_range_to_lsp_range, char_to_lsp_position, lsp_position_to_char, lsp_range_to_char_range};
pub use sync::{DocumentSync, SyncOptions};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The service main loop stopped and the outbound queue is closed.
	#[error("service stopped")]
	ServiceStopped,
	/// The peer replied something that violates the protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// The peer replied with an error response.
	#[error("server responded with error {code}: {message}")]
	Response {
		/// JSON-RPC error code.
		code: i64,
		/// Error message reported by the server.
		message: String,
	},
	/// Transport I/O failed.
	#[error("{0}")]
	Io(#[from] std::io::Error),
	/// A payload failed to (de)serialize.
	#[error("{0}")]
	Deserialize(#[from] serde_json::Error),
	/// The document is not open on this client.
	#[error("document not open: {0}")]
	NotOpen(String),
}

/// Converts a filesystem path to a `file://` URI.
///
/// Relative paths are resolved against the current directory first.
pub fn uri_from_path(path: &Path) -> Option<Uri> {
	let abs = if path.is_absolute() {
		path.to_path_buf()
	} else {
		std::env::current_dir().ok()?.join(path)
	};
	let url = url::Url::from_file_path(&abs).ok()?;
	Uri::from_str(url.as_str()).ok()
}

/// Converts a `file://` URI back to a filesystem path.
pub fn path_from_uri(uri: &Uri) -> Option<PathBuf> {
	url::Url::parse(uri.as_str()).ok()?.to_file_path().ok()
}
