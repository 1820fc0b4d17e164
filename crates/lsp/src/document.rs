//! Per-document sync state shared between the editor thread and the throttle task.
//!
//! The version counter and the pending full-sync snapshot sit behind one lock, so a
//! tick that takes the snapshot and bumps the version can never interleave with an
//! edit that replaces the snapshot, or with a close that discards it.

use lsp_types::Uri;
use parking_lot::Mutex;
use ropey::Rope;

/// Version assigned on open.
pub const INITIAL_VERSION: i32 = 1;

#[derive(Debug)]
struct Inner {
	version: i32,
	pending_full: Option<Rope>,
	open: bool,
}

/// LSP state for a single open document.
#[derive(Debug)]
pub struct DocumentState {
	uri: Uri,
	language_id: String,
	inner: Mutex<Inner>,
}

impl DocumentState {
	/// Creates an open document at [`INITIAL_VERSION`].
	pub fn new(uri: Uri, language_id: impl Into<String>) -> Self {
		Self {
			uri,
			language_id: language_id.into(),
			inner: Mutex::new(Inner {
				version: INITIAL_VERSION,
				pending_full: None,
				open: true,
			}),
		}
	}

	/// Get the document URI.
	pub fn uri(&self) -> &Uri {
		&self.uri
	}

	/// Get the language ID.
	pub fn language_id(&self) -> &str {
		&self.language_id
	}

	/// Version of the last change sent, or [`INITIAL_VERSION`] if none was.
	pub fn version(&self) -> i32 {
		self.inner.lock().version
	}

	/// Whether the document is still open.
	pub fn is_open(&self) -> bool {
		self.inner.lock().open
	}

	/// Whether a full sync is waiting for the next tick.
	pub fn is_dirty(&self) -> bool {
		self.inner.lock().pending_full.is_some()
	}

	/// Bumps the version and runs `send` with it while the lock is held.
	///
	/// `send` must not block; it is expected to enqueue. Returns `None` without
	/// calling `send` once the document is closed.
	pub fn with_next_version<R>(&self, send: impl FnOnce(i32) -> R) -> Option<R> {
		let mut inner = self.inner.lock();
		if !inner.open {
			return None;
		}
		inner.version += 1;
		Some(send(inner.version))
	}

	/// Replaces the pending full-sync snapshot.
	///
	/// Returns true if the document was clean before, false if a snapshot was
	/// already pending or the document is closed.
	pub fn mark_dirty(&self, snapshot: Rope) -> bool {
		let mut inner = self.inner.lock();
		if !inner.open {
			return false;
		}
		inner.pending_full.replace(snapshot).is_none()
	}

	/// Takes the pending snapshot, bumps the version, and runs `send` with both
	/// while the lock is held.
	///
	/// Returns `None` if nothing was pending or the document is closed.
	pub fn take_full_sync<R>(&self, send: impl FnOnce(i32, Rope) -> R) -> Option<R> {
		let mut inner = self.inner.lock();
		if !inner.open {
			return None;
		}
		let snapshot = inner.pending_full.take()?;
		inner.version += 1;
		Some(send(inner.version, snapshot))
	}

	/// Marks the document closed and discards any pending snapshot.
	///
	/// Returns false if it was already closed.
	pub fn close(&self) -> bool {
		let mut inner = self.inner.lock();
		inner.pending_full = None;
		std::mem::replace(&mut inner.open, false)
	}
}

#[cfg(test)]
mod tests {
	use std::str::FromStr;

	use super::*;

	fn doc() -> DocumentState {
		DocumentState::new(Uri::from_str("file:///tmp/a.swift").unwrap(), "swift")
	}

	#[test]
	fn versions_start_at_one_and_increase() {
		let doc = doc();
		assert_eq!(doc.version(), 1);
		assert_eq!(doc.with_next_version(|v| v), Some(2));
		assert_eq!(doc.with_next_version(|v| v), Some(3));
		assert_eq!(doc.version(), 3);
	}

	#[test]
	fn full_sync_takes_latest_snapshot_once() {
		let doc = doc();
		assert!(doc.mark_dirty(Rope::from("a")));
		assert!(!doc.mark_dirty(Rope::from("ab")));
		assert!(doc.is_dirty());

		let sent = doc.take_full_sync(|v, text| (v, text.to_string()));
		assert_eq!(sent, Some((2, "ab".to_string())));
		assert!(!doc.is_dirty());
		assert_eq!(doc.take_full_sync(|v, _| v), None);
		assert_eq!(doc.version(), 2);
	}

	#[test]
	fn close_discards_pending_and_blocks_sends() {
		let doc = doc();
		doc.mark_dirty(Rope::from("x"));
		assert!(doc.close());
		assert!(!doc.close());
		assert!(!doc.is_dirty());
		assert_eq!(doc.take_full_sync(|v, _| v), None);
		assert_eq!(doc.with_next_version(|v| v), None);
		assert!(!doc.mark_dirty(Rope::from("y")));
	}
}
