//! Per-editor coordinator tying a buffer to its language server.
//!
//! The [`Coordinator`] is driven from the UI thread. It observes buffer edits
//! (as a [`BufferObserver`]) and forwards them to [`DocumentSync`], detects
//! completion triggers, owns the single live [`CompletionSession`] and
//! re-highlights after every edit. Completion responses and highlight results arrive from worker tasks as
//! [`CoordinatorEvent`]s; [`Coordinator::pump_events`] applies them and returns
//! what the completion popover should do.

mod events;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stride_lsp::completion::{
	CloseReason, CompletionController, CompletionRequest, CompletionSession, CompletionState, CompletionTrigger, KeyChord, ReceiveOutcome, RefilterOutcome,
	TriggerSet,
};
use stride_lsp::lsp_types::{CompletionItem, Diagnostic, Uri};
use stride_lsp::{ClientHandle, DocumentSync, SyncMode, char_to_lsp_position, lsp_range_to_char_range, path_from_uri, uri_from_path};
use stride_primitives::rope::line_content_end;
use stride_primitives::{Buffer, BufferObserver, Rope, TextBuffer};
use stride_worker::WorkerRuntime;
use tokio::sync::mpsc;

pub use self::events::{CoordinatorEvent, PopoverEvent};
use crate::config::{ConfigError, EditorConfig};
use crate::diagnostics::DiagnosticsByLine;
use crate::highlight::{HighlightScheduler, HighlightSpan, Highlighter, ProcessHighlighter};
use crate::project::{ProjectIndex, ProjectRegistry};
use crate::{EditorError, Result};

/// Language id sent for files no `[[language]]` entry claims.
const PLAIN_TEXT: &str = "plaintext";

#[derive(Debug)]
struct OpenDocument {
	path: PathBuf,
	uri: Uri,
	language_id: String,
	sync: Option<DocumentSync>,
	triggers: TriggerSet,
}

/// Coordinates one editor view with its language server, highlighter and project.
pub struct Coordinator {
	config: EditorConfig,
	runtime: WorkerRuntime,
	projects: Arc<ProjectRegistry>,
	client: Option<ClientHandle>,
	highlighter: Option<Arc<dyn Highlighter>>,
	manual_trigger: KeyChord,
	document: Option<OpenDocument>,
	completion: CompletionController,
	session: Option<CompletionSession>,
	highlights: HighlightScheduler,
	spans: Vec<HighlightSpan>,
	diagnostics: DiagnosticsByLine,
	events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
	events_rx: mpsc::UnboundedReceiver<CoordinatorEvent>,
	popover: Vec<PopoverEvent>,
	applying_selection: bool,
}

impl std::fmt::Debug for Coordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Coordinator")
			.field("document", &self.document)
			.field("session", &self.session)
			.field("has_client", &self.client.is_some())
			.finish_non_exhaustive()
	}
}

impl Coordinator {
	/// Creates a coordinator with no language server attached.
	///
	/// A `[highlight]` section in `config` enables the process highlighter.
	pub fn new(config: EditorConfig, runtime: WorkerRuntime, projects: Arc<ProjectRegistry>) -> Result<Self, ConfigError> {
		let manual_trigger = config.completion.manual_trigger()?;
		let highlighter = config
			.highlight
			.as_ref()
			.map(|h| Arc::new(ProcessHighlighter::from_config(h)) as Arc<dyn Highlighter>);
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Ok(Self {
			completion: CompletionController::new(runtime.clone(), config.completion.typing_debounce()),
			highlights: HighlightScheduler::new(runtime.clone()),
			config,
			runtime,
			projects,
			client: None,
			highlighter,
			manual_trigger,
			document: None,
			session: None,
			spans: Vec::new(),
			diagnostics: DiagnosticsByLine::default(),
			events_tx,
			events_rx,
			popover: Vec::new(),
			applying_selection: false,
		})
	}

	/// Attaches the language server used for documents opened from now on.
	pub fn with_client(mut self, client: ClientHandle) -> Self {
		self.client = Some(client);
		self
	}

	/// Replaces the highlighter.
	pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
		self.highlighter = Some(highlighter);
		self
	}

	/// The active configuration.
	pub fn config(&self) -> &EditorConfig {
		&self.config
	}

	/// The language server connection, if any.
	pub fn client(&self) -> Option<&ClientHandle> {
		self.client.as_ref()
	}

	/// Path of the open file.
	pub fn path(&self) -> Option<&Path> {
		self.document.as_ref().map(|d| d.path.as_path())
	}

	/// URI of the open file.
	pub fn uri(&self) -> Option<&Uri> {
		self.document.as_ref().map(|d| &d.uri)
	}

	/// Language id of the open file.
	pub fn language_id(&self) -> Option<&str> {
		self.document.as_ref().map(|d| d.language_id.as_str())
	}

	/// Sync mode of the open document; [`SyncMode::None`] without a server.
	pub fn sync_mode(&self) -> SyncMode {
		self.sync().map_or(SyncMode::None, DocumentSync::mode)
	}

	/// Version of the last change sent for the open document.
	pub fn document_version(&self) -> Option<i32> {
		self.sync().map(DocumentSync::version)
	}

	/// The current completion session, open or most recently closed.
	pub fn completion_session(&self) -> Option<&CompletionSession> {
		self.session.as_ref()
	}

	/// Spans from the latest highlight pass, in char offsets of the text it ran on.
	pub fn highlights(&self) -> &[HighlightSpan] {
		&self.spans
	}

	/// Diagnostics for the open file, grouped by line.
	pub fn diagnostics_by_line(&self) -> &DiagnosticsByLine {
		&self.diagnostics
	}

	/// Opens `path`, whose contents `buffer` already holds.
	///
	/// Any open document is closed first.
	pub fn open(&mut self, path: &Path, buffer: &dyn TextBuffer) -> Result<()> {
		let uri = uri_from_path(path).ok_or_else(|| EditorError::InvalidPath(path.to_path_buf()))?;
		self.close();

		let language_id = self.config.language_for_path(path).map_or(PLAIN_TEXT, |l| l.name.as_str()).to_string();
		let sync = self
			.client
			.as_ref()
			.map(|client| DocumentSync::open(client.clone(), uri.clone(), language_id.clone(), buffer.text(), &self.config.sync.options(), &self.runtime));
		let characters = self.client.as_ref().map(|c| c.negotiated().trigger_characters.clone()).unwrap_or_default();
		let triggers = TriggerSet::new(characters, self.manual_trigger);

		tracing::debug!(path = %path.display(), language = %language_id, has_server = sync.is_some(), "editor.open");
		self.document = Some(OpenDocument {
			path: path.to_path_buf(),
			uri,
			language_id,
			sync,
			triggers,
		});
		self.schedule_highlight(buffer.text());
		Ok(())
	}

	/// Loads `path` into `buffer` and opens it.
	pub fn open_file(&mut self, path: &Path, buffer: &mut Buffer) -> Result<()> {
		let text = read_file(path)?;
		buffer.reset(&text);
		self.open(path, buffer)
	}

	/// Closes the open document. Returns false if nothing was open.
	///
	/// Closes any completion session, cancels pending highlight work and sends
	/// `didClose`.
	pub fn close(&mut self) -> bool {
		let Some(document) = self.document.take() else {
			return false;
		};
		self.close_session(CloseReason::DocumentClosed);
		self.completion.cancel();
		self.highlights.cancel();
		self.spans.clear();
		self.diagnostics = DiagnosticsByLine::default();
		if let Some(sync) = document.sync {
			sync.close();
		}
		tracing::debug!(path = %document.path.display(), "editor.close");
		true
	}

	/// Discards in-memory edits: closes the document and reopens it from disk.
	///
	/// The server sees `didClose` then `didOpen` at version 1.
	pub fn revert(&mut self, buffer: &mut Buffer) -> Result<()> {
		let path = self.path().map(Path::to_path_buf).ok_or(EditorError::NotOpen)?;
		let text = read_file(&path)?;
		self.close();
		buffer.reset(&text);
		self.open(&path, buffer)
	}

	/// Writes `buffer` to the open file, notifies the server and re-highlights.
	pub fn save(&mut self, buffer: &dyn TextBuffer) -> Result<()> {
		let document = self.document.as_ref().ok_or(EditorError::NotOpen)?;
		let path = document.path.clone();
		std::fs::write(&path, buffer.text().to_string()).map_err(|source| EditorError::Io { path: path.clone(), source })?;
		if let Some(sync) = &document.sync {
			sync.did_save(buffer.text());
		}
		tracing::trace!(path = %path.display(), "editor.save");
		self.schedule_highlight(buffer.text());
		Ok(())
	}

	/// Runs one full-sync tick now. Returns true if a `didChange` was sent.
	pub fn flush_full_sync(&self) -> bool {
		self.sync().is_some_and(DocumentSync::flush_full_sync)
	}

	/// Handles a key chord; starts a manual completion request if it is the
	/// configured trigger.
	pub fn trigger_completion(&mut self, buffer: &dyn TextBuffer, key: &KeyChord) -> bool {
		let manual = self.document.as_ref().is_some_and(|d| d.triggers.is_manual(key));
		manual && self.request_completion(buffer, CompletionTrigger::Manual).is_some()
	}

	/// Starts a completion request at the cursor, superseding any current one.
	///
	/// In full sync mode the pending snapshot is sent first so the server sees
	/// the text the request refers to. Returns the request id, or `None` when
	/// completion is unavailable or the cursor cannot be expressed as a wire
	/// position.
	pub fn request_completion(&mut self, buffer: &dyn TextBuffer, trigger: CompletionTrigger) -> Option<u64> {
		if !self.config.completion.enabled {
			return None;
		}
		let client = self.client.clone()?;
		let document = self.document.as_ref()?;
		if let Some(sync) = &document.sync
			&& sync.mode() == SyncMode::Full
			&& sync.flush_full_sync()
		{
			tracing::trace!(version = sync.version(), "editor.completion.flushed_full_sync");
		}
		let uri = document.uri.clone();
		let text = buffer.text();
		let cursor = buffer.cursor();
		let filter = document.triggers.filter_text(text.slice(..), cursor);

		self.close_session(CloseReason::Superseded);
		let id = self.completion.next_id();
		let mut session = CompletionSession::new(id, cursor, trigger.clone());
		let Some(position) = char_to_lsp_position(text, cursor, client.offset_encoding()) else {
			tracing::debug!(id, cursor, "editor.completion.untranslatable");
			session.close(CloseReason::Untranslatable);
			self.session = Some(session);
			return None;
		};
		session.begin_request();
		session.refilter(filter);
		self.session = Some(session);

		let events = self.events_tx.clone();
		self.completion.trigger(
			CompletionRequest {
				id,
				client,
				uri,
				position,
				trigger,
			},
			move |event| {
				let _ = events.send(CoordinatorEvent::Completion(event));
			},
		);
		Some(id)
	}

	/// Accepts the `index`-th visible completion item into `buffer`.
	///
	/// Returns false if no results are shown or `index` is out of range. With
	/// snippets enabled, the first placeholder of the inserted text is selected.
	pub fn select_completion(&mut self, buffer: &mut Buffer, index: usize) -> Result<bool> {
		let Some(session) = self.session.as_mut() else {
			return Ok(false);
		};
		let id = session.id();
		let Some(acceptance) = session.accept(index, buffer.cursor()) else {
			return Ok(false);
		};
		self.completion.cancel();
		self.popover.push(PopoverEvent::Close {
			id,
			reason: CloseReason::Accepted,
		});

		self.applying_selection = true;
		let inserted = buffer.insert(acceptance.at, &acceptance.text, &mut *self);
		self.applying_selection = false;
		inserted?;

		if self.config.completion.snippets
			&& let Some(selection) = acceptance.selection
		{
			buffer.select(selection)?;
		}
		Ok(true)
	}

	/// Jumps to the definition of the symbol at the cursor.
	///
	/// A definition in another file is loaded into `buffer` first. The target is
	/// selected; an empty target range selects its whole line. Returns false
	/// when there is no server or no answer, or the answer does not map onto the text.
	pub async fn goto_definition(&mut self, buffer: &mut Buffer) -> Result<bool> {
		let (Some(client), Some(document)) = (self.client.clone(), self.document.as_ref()) else {
			return Ok(false);
		};
		let encoding = client.offset_encoding();
		let Some(position) = char_to_lsp_position(buffer.text(), buffer.cursor(), encoding) else {
			return Ok(false);
		};
		let location = match client.definition(document.uri.clone(), position).await {
			Ok(Some(location)) => location,
			Ok(None) => {
				tracing::trace!(line = position.line, character = position.character, "editor.definition.none");
				return Ok(false);
			}
			Err(error) => {
				tracing::warn!(%error, "editor.definition.failed");
				return Ok(false);
			}
		};

		let path = path_from_uri(&location.uri).ok_or_else(|| EditorError::InvalidUri(location.uri.as_str().to_string()))?;
		if self.path() != Some(path.as_path()) {
			tracing::debug!(path = %path.display(), "editor.definition.other_file");
			self.open_file(&path, buffer)?;
		}

		let range = location.range;
		let target = if range.start == range.end {
			line_range(buffer.text(), range.start.line as usize)
		} else {
			lsp_range_to_char_range(buffer.text(), range, encoding)
		};
		let Some(target) = target else {
			tracing::debug!(?range, "editor.definition.untranslatable");
			return Ok(false);
		};
		buffer.select(target)?;
		self.update_completion(&*buffer);
		Ok(true)
	}

	/// Closes the completion session. Returns false if none was open.
	pub fn dismiss_completion(&mut self) -> bool {
		self.close_session(CloseReason::Dismissed)
	}

	/// Re-evaluates the completion session after a cursor move without an edit.
	pub fn cursor_moved(&mut self, buffer: &dyn TextBuffer) {
		self.update_completion(buffer);
	}

	/// Replaces the diagnostics for `uri` if it is the open document.
	pub fn set_diagnostics(&mut self, uri: &Uri, diagnostics: &[Diagnostic]) -> bool {
		if self.uri() != Some(uri) {
			tracing::trace!(uri = uri.as_str(), "editor.diagnostics.other_document");
			return false;
		}
		self.diagnostics = DiagnosticsByLine::new(diagnostics);
		true
	}

	/// Indexes `root` in the shared project registry.
	pub fn open_project(&self, root: &Path) -> Result<Arc<ProjectIndex>> {
		Ok(self.projects.open_project(root)?)
	}

	/// Files matching `pattern` in the project containing the open file.
	pub fn quick_open(&self, pattern: &str) -> Vec<PathBuf> {
		let Some(index) = self.path().and_then(|p| self.projects.project_for(p)) else {
			return Vec::new();
		};
		index.find_files(pattern).into_iter().map(Path::to_path_buf).collect()
	}

	/// Waits for the next event from a worker task.
	pub async fn next_event(&mut self) -> Option<CoordinatorEvent> {
		self.events_rx.recv().await
	}

	/// Applies one worker event.
	pub fn handle_event(&mut self, event: CoordinatorEvent) {
		match event {
			CoordinatorEvent::Completion(response) => self.receive_completion(response.id, response.result),
			CoordinatorEvent::Highlight(pass) => {
				if !self.highlights.is_current(pass.generation) {
					tracing::trace!(generation = pass.generation, "editor.highlight.stale");
					return;
				}
				match pass.result {
					Ok(spans) => self.spans = spans,
					Err(error) => tracing::warn!(%error, "editor.highlight.failed"),
				}
			}
		}
	}

	/// Applies every queued worker event and drains the popover events
	/// produced since the last call.
	pub fn pump_events(&mut self) -> Vec<PopoverEvent> {
		while let Ok(event) = self.events_rx.try_recv() {
			self.handle_event(event);
		}
		std::mem::take(&mut self.popover)
	}

	fn sync(&self) -> Option<&DocumentSync> {
		self.document.as_ref()?.sync.as_ref()
	}

	fn receive_completion(&mut self, id: u64, result: stride_lsp::Result<Vec<CompletionItem>>) {
		let Some(session) = self.session.as_mut() else {
			tracing::trace!(id, "editor.completion.no_session");
			return;
		};
		match session.receive(id, result) {
			ReceiveOutcome::Stale => {}
			ReceiveOutcome::Shown => {
				let items = visible(session);
				tracing::debug!(id, items = items.len(), "editor.completion.show");
				self.popover.push(PopoverEvent::Show {
					id,
					anchor: session.origin(),
					items,
				});
			}
			ReceiveOutcome::Closed(reason) => tracing::debug!(id, ?reason, "editor.completion.closed"),
		}
	}

	fn update_completion(&mut self, buffer: &dyn TextBuffer) {
		let (Some(document), Some(session)) = (self.document.as_ref(), self.session.as_mut()) else {
			return;
		};
		if !session.is_open() {
			return;
		}
		let cursor = buffer.cursor();
		if cursor < session.origin() {
			self.close_session(CloseReason::CursorBeforeOrigin);
			return;
		}
		let id = session.id();
		let filter = document.triggers.filter_text(buffer.text().slice(..), cursor);
		match session.refilter(filter) {
			RefilterOutcome::Unchanged => {}
			RefilterOutcome::Updated => {
				let items = visible(session);
				self.popover.push(PopoverEvent::Update { id, items });
			}
			RefilterOutcome::Closed(reason) => self.popover.push(PopoverEvent::Close { id, reason }),
		}
	}

	/// Closes the live session and, if its popover was showing, queues a close.
	fn close_session(&mut self, reason: CloseReason) -> bool {
		let Some(session) = self.session.as_mut() else {
			return false;
		};
		let shown = session.state() == CompletionState::HasResults;
		if !session.close(reason) {
			return false;
		}
		self.completion.cancel();
		if shown {
			self.popover.push(PopoverEvent::Close { id: session.id(), reason });
		}
		true
	}

	fn schedule_highlight(&mut self, text: &Rope) {
		let (Some(highlighter), Some(document)) = (self.highlighter.clone(), self.document.as_ref()) else {
			return;
		};
		let events = self.events_tx.clone();
		self.highlights.schedule(highlighter, document.path.clone(), text.clone(), move |result| {
			let _ = events.send(CoordinatorEvent::Highlight(result));
		});
	}

	fn auto_trigger(&mut self, buffer: &dyn TextBuffer, at: usize, text: &str) -> bool {
		let end = at + text.chars().count();
		if buffer.cursor() != end {
			return false;
		}
		let trigger = self
			.document
			.as_ref()
			.filter(|d| d.triggers.is_automatic())
			.and_then(|d| d.triggers.trigger_ending_at(buffer.text().slice(..), end))
			.map(str::to_string);
		match trigger {
			Some(trigger) => {
				tracing::trace!(%trigger, "editor.completion.auto_trigger");
				self.request_completion(buffer, CompletionTrigger::Typing(trigger));
				true
			}
			None => false,
		}
	}
}

impl BufferObserver for Coordinator {
	fn did_insert(&mut self, buffer: &dyn TextBuffer, at: usize, text: &str) {
		if let Some(sync) = self.sync() {
			sync.did_insert(buffer.text(), at, text);
		}
		self.schedule_highlight(buffer.text());
		if self.applying_selection {
			return;
		}
		if !self.auto_trigger(buffer, at, text) {
			self.update_completion(buffer);
		}
	}

	fn will_delete(&mut self, buffer: &dyn TextBuffer, at: usize, count: usize) {
		if let Some(sync) = self.sync() {
			sync.will_delete(buffer.text(), at, count);
		}
	}

	fn did_delete(&mut self, buffer: &dyn TextBuffer, _at: usize, _count: usize) {
		if let Some(sync) = self.sync() {
			sync.did_delete(buffer.text());
		}
		self.schedule_highlight(buffer.text());
		self.update_completion(buffer);
	}
}

fn visible(session: &CompletionSession) -> Vec<CompletionItem> {
	session.visible_items().into_iter().cloned().collect()
}

/// Chars of `line` without its line break.
fn line_range(text: &Rope, line: usize) -> Option<std::ops::Range<usize>> {
	let end = line_content_end(text.slice(..), line)?;
	Some(text.line_to_char(line)..end)
}

fn read_file(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|source| EditorError::Io {
		path: path.to_path_buf(),
		source,
	})
}
