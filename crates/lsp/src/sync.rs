//! Document synchronization between an editor buffer and a language server.
//!
//! [`DocumentSync`] is created when a file is opened and consumed when it is
//! closed. Incremental servers get one `didChange` per edit, enqueued before the
//! edit hook returns. Full-sync servers get at most one `didChange` per throttle
//! period carrying the latest snapshot; the throttle task is idle while the
//! document is clean.

use std::sync::Arc;
use std::time::Duration;

use lsp_types::{
	DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams, TextDocumentContentChangeEvent,
	TextDocumentIdentifier, TextDocumentItem, Uri, VersionedTextDocumentIdentifier,
};
use ropey::Rope;
use stride_primitives::Edit;
use stride_worker::{TaskClass, WorkerRuntime};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::capabilities::{SaveNotification, SyncMode};
use crate::changes::{encode_change, full_change};
use crate::client::{ClientHandle, Notification, OffsetEncoding};
use crate::document::{DocumentState, INITIAL_VERSION};

/// Tunables for [`DocumentSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
	/// Minimum spacing between full-document syncs.
	pub full_sync_interval: Duration,
	/// Send `didSave` when the server asked for it.
	pub send_did_save: bool,
}

impl Default for SyncOptions {
	fn default() -> Self {
		Self {
			full_sync_interval: Duration::from_secs(1),
			send_did_save: true,
		}
	}
}

#[derive(Debug)]
struct Throttle {
	wake: Arc<Notify>,
	cancel: CancellationToken,
}

/// Keeps one language server's view of one document in step with the buffer.
#[derive(Debug)]
pub struct DocumentSync {
	client: ClientHandle,
	document: Arc<DocumentState>,
	mode: SyncMode,
	encoding: OffsetEncoding,
	save: SaveNotification,
	throttle: Option<Throttle>,
}

impl DocumentSync {
	/// Opens `uri` on the server with `text` at version 1.
	///
	/// In full-sync mode this also starts the (idle) throttle task on `runtime`.
	pub fn open(client: ClientHandle, uri: Uri, language_id: impl Into<String>, text: &Rope, options: &SyncOptions, runtime: &WorkerRuntime) -> Self {
		let negotiated = client.negotiated();
		let mode = negotiated.sync_mode;
		let encoding = negotiated.encoding;
		let save = if options.send_did_save { negotiated.save } else { SaveNotification::Disabled };
		let document = Arc::new(DocumentState::new(uri, language_id));

		tracing::debug!(uri = document.uri().as_str(), language = document.language_id(), ?mode, "lsp.sync.open");
		enqueue(
			&client,
			Notification::DidOpen(DidOpenTextDocumentParams {
				text_document: TextDocumentItem {
					uri: document.uri().clone(),
					language_id: document.language_id().to_string(),
					version: INITIAL_VERSION,
					text: text.to_string(),
				},
			}),
		);

		let throttle = (mode == SyncMode::Full).then(|| {
			let wake = Arc::new(Notify::new());
			let cancel = CancellationToken::new();
			let tick_document = document.clone();
			let tick_client = client.clone();
			runtime.spawn_throttled(TaskClass::Background, options.full_sync_interval, wake.clone(), cancel.clone(), move || {
				flush(&tick_document, &tick_client);
			});
			Throttle { wake, cancel }
		});

		Self {
			client,
			document,
			mode,
			encoding,
			save,
			throttle,
		}
	}

	/// The document URI.
	pub fn uri(&self) -> &Uri {
		self.document.uri()
	}

	/// The language id sent with `didOpen`.
	pub fn language_id(&self) -> &str {
		self.document.language_id()
	}

	/// Sync mode negotiated with the server.
	pub fn mode(&self) -> SyncMode {
		self.mode
	}

	/// Position encoding negotiated with the server.
	pub fn encoding(&self) -> OffsetEncoding {
		self.encoding
	}

	/// Version of the last change sent.
	pub fn version(&self) -> i32 {
		self.document.version()
	}

	/// Whether a full sync is waiting for the next tick.
	pub fn is_dirty(&self) -> bool {
		self.document.is_dirty()
	}

	/// Handles `inserted` having been inserted at `at`; `text` already contains it.
	pub fn did_insert(&self, text: &Rope, at: usize, inserted: &str) {
		match self.mode {
			SyncMode::None => {}
			SyncMode::Full => self.mark_dirty(text),
			SyncMode::Incremental => self.send_incremental(text, &Edit::insert(at, inserted)),
		}
	}

	/// Handles `count` chars at `at` about to be removed; `text` still contains them.
	pub fn will_delete(&self, text: &Rope, at: usize, count: usize) {
		if self.mode == SyncMode::Incremental {
			self.send_incremental(text, &Edit::delete(at, count));
		}
	}

	/// Handles a completed removal; `text` is the post-delete buffer.
	pub fn did_delete(&self, text: &Rope) {
		if self.mode == SyncMode::Full {
			self.mark_dirty(text);
		}
	}

	/// Sends `didSave` if the server asked for it.
	pub fn did_save(&self, text: &Rope) {
		let SaveNotification::Enabled { include_text } = self.save else {
			return;
		};
		if !self.document.is_open() {
			return;
		}
		enqueue(
			&self.client,
			Notification::DidSave(DidSaveTextDocumentParams {
				text_document: TextDocumentIdentifier { uri: self.uri().clone() },
				text: include_text.then(|| text.to_string()),
			}),
		);
	}

	/// Runs one throttle tick now: sends the pending snapshot, if any.
	///
	/// Returns true if a `didChange` was enqueued.
	pub fn flush_full_sync(&self) -> bool {
		flush(&self.document, &self.client)
	}

	/// Stops the throttle, discards pending state and sends `didClose`.
	pub fn close(mut self) {
		self.stop_throttle();
		if !self.document.close() {
			return;
		}
		tracing::debug!(uri = self.uri().as_str(), version = self.document.version(), "lsp.sync.close");
		enqueue(
			&self.client,
			Notification::DidClose(DidCloseTextDocumentParams {
				text_document: TextDocumentIdentifier { uri: self.uri().clone() },
			}),
		);
	}

	fn mark_dirty(&self, text: &Rope) {
		if self.document.mark_dirty(text.clone()) {
			tracing::trace!(uri = self.uri().as_str(), "lsp.sync.dirty");
		}
		if let Some(throttle) = &self.throttle {
			throttle.wake.notify_one();
		}
	}

	fn send_incremental(&self, text: &Rope, edit: &Edit) {
		let Some(change) = encode_change(text, edit, self.mode, self.encoding) else {
			tracing::debug!(uri = self.uri().as_str(), ?edit, "lsp.sync.untranslatable");
			return;
		};
		let sent = self.document.with_next_version(|version| {
			tracing::trace!(uri = self.uri().as_str(), version, "lsp.sync.did_change");
			enqueue(&self.client, did_change(self.uri(), version, change));
		});
		if sent.is_none() {
			tracing::debug!(uri = self.uri().as_str(), "lsp.sync.change_after_close");
		}
	}

	fn stop_throttle(&mut self) {
		if let Some(throttle) = self.throttle.take() {
			throttle.cancel.cancel();
		}
	}
}

impl Drop for DocumentSync {
	fn drop(&mut self) {
		self.stop_throttle();
	}
}

fn flush(document: &DocumentState, client: &ClientHandle) -> bool {
	document
		.take_full_sync(|version, snapshot| {
			tracing::trace!(uri = document.uri().as_str(), version, "lsp.sync.full");
			enqueue(client, did_change(document.uri(), version, full_change(&snapshot)));
		})
		.is_some()
}

fn did_change(uri: &Uri, version: i32, change: TextDocumentContentChangeEvent) -> Notification {
	Notification::DidChange(DidChangeTextDocumentParams {
		text_document: VersionedTextDocumentIdentifier { uri: uri.clone(), version },
		content_changes: vec![change],
	})
}

fn enqueue(client: &ClientHandle, notification: Notification) {
	let method = notification.method();
	if let Err(error) = client.notify(notification) {
		tracing::warn!(method, %error, "lsp.sync.enqueue_failed");
	}
}

#[cfg(test)]
mod tests;
