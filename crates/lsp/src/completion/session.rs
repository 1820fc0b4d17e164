//! State machine for one completion request.
//!
//! ```text
//! Created ──► PendingResults ──► HasResults
//!    │              │                │
//!    └──────────────┴────────────────┴──► Closed
//! ```
//!
//! A session only accepts the response carrying its own id. Everything that
//! happens after the request is issued (typing, deleting, moving the cursor) is
//! applied by re-filtering the cached items; the server is not asked again.

use std::ops::Range;

use lsp_types::CompletionItem;

use super::controller::CompletionTrigger;
use super::filter::{CompletionFilter, insert_text};
use super::snippet::first_placeholder;

/// Lifecycle state of a [`CompletionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
	/// Origin captured, request not yet issued.
	Created,
	/// Request issued, waiting for the response.
	PendingResults,
	/// Items cached and shown.
	HasResults,
	/// Terminal.
	Closed,
}

/// Why a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	/// Dismissed by the user.
	Dismissed,
	/// An item was accepted.
	Accepted,
	/// The cursor moved before the origin.
	CursorBeforeOrigin,
	/// A newer request replaced this one.
	Superseded,
	/// The request failed.
	Failed,
	/// No cached item matches the typed text.
	NoMatches,
	/// The origin could not be translated to a wire position.
	Untranslatable,
	/// The document was closed.
	DocumentClosed,
}

/// Result of feeding a response to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
	/// Not for this session, or the session is no longer waiting. Dropped.
	Stale,
	/// Results are cached and at least one item is visible.
	Shown,
	/// The response closed the session.
	Closed(CloseReason),
}

/// Result of re-filtering a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefilterOutcome {
	/// No visible change: still waiting for results, or already closed.
	Unchanged,
	/// The visible item list was recomputed and is non-empty.
	Updated,
	/// Re-filtering closed the session.
	Closed(CloseReason),
}

/// Text to insert for an accepted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
	/// Char offset to insert at.
	pub at: usize,
	/// Text to insert, with any placeholder markers left in place.
	pub text: String,
	/// Char range of the first placeholder after insertion, to be selected.
	pub selection: Option<Range<usize>>,
}

/// One completion request and its cached results.
#[derive(Debug)]
pub struct CompletionSession {
	id: u64,
	origin: usize,
	trigger: CompletionTrigger,
	state: CompletionState,
	items: Vec<CompletionItem>,
	visible: Vec<usize>,
	filter: Option<String>,
	matcher: CompletionFilter,
	close_reason: Option<CloseReason>,
}

impl CompletionSession {
	/// Creates a session anchored at `origin`.
	pub fn new(id: u64, origin: usize, trigger: CompletionTrigger) -> Self {
		Self {
			id,
			origin,
			trigger,
			state: CompletionState::Created,
			items: Vec::new(),
			visible: Vec::new(),
			filter: None,
			matcher: CompletionFilter::new(),
			close_reason: None,
		}
	}

	/// Request id.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Char offset the request was issued at.
	pub fn origin(&self) -> usize {
		self.origin
	}

	/// What started the request.
	pub fn trigger(&self) -> &CompletionTrigger {
		&self.trigger
	}

	/// Current state.
	pub fn state(&self) -> CompletionState {
		self.state
	}

	/// Whether the session has not closed.
	pub fn is_open(&self) -> bool {
		self.state != CompletionState::Closed
	}

	/// Why the session closed, once it has.
	pub fn close_reason(&self) -> Option<CloseReason> {
		self.close_reason
	}

	/// Filter text last applied.
	pub fn filter_text(&self) -> Option<&str> {
		self.filter.as_deref()
	}

	/// Every cached item, in server order.
	pub fn items(&self) -> &[CompletionItem] {
		&self.items
	}

	/// Items passing the current filter, best match first.
	pub fn visible_items(&self) -> Vec<&CompletionItem> {
		self.visible.iter().map(|&i| &self.items[i]).collect()
	}

	/// Number of items passing the current filter.
	pub fn visible_len(&self) -> usize {
		self.visible.len()
	}

	/// Marks the request as issued.
	///
	/// Returns false unless the session was in [`CompletionState::Created`].
	pub fn begin_request(&mut self) -> bool {
		if self.state != CompletionState::Created {
			return false;
		}
		self.state = CompletionState::PendingResults;
		true
	}

	/// Feeds the response for request `id`.
	pub fn receive(&mut self, id: u64, result: crate::Result<Vec<CompletionItem>>) -> ReceiveOutcome {
		if id != self.id || self.state != CompletionState::PendingResults {
			tracing::trace!(id, active = self.id, state = ?self.state, "lsp.completion.stale");
			return ReceiveOutcome::Stale;
		}
		let items = match result {
			Ok(items) => items,
			Err(error) => {
				tracing::debug!(id, %error, "lsp.completion.failed");
				self.close(CloseReason::Failed);
				return ReceiveOutcome::Closed(CloseReason::Failed);
			}
		};

		self.items = items;
		self.state = CompletionState::HasResults;
		self.visible = self.matcher.filter(&self.items, self.filter.as_deref());
		tracing::debug!(id, items = self.items.len(), visible = self.visible.len(), "lsp.completion.results");
		if self.visible.is_empty() {
			self.close(CloseReason::NoMatches);
			return ReceiveOutcome::Closed(CloseReason::NoMatches);
		}
		ReceiveOutcome::Shown
	}

	/// Applies new filter text to the cached items.
	///
	/// While results are pending the text is only remembered; it is applied when
	/// they arrive.
	pub fn refilter(&mut self, filter: Option<String>) -> RefilterOutcome {
		self.filter = filter;
		match self.state {
			CompletionState::Closed | CompletionState::PendingResults => RefilterOutcome::Unchanged,
			CompletionState::Created => {
				self.close(CloseReason::NoMatches);
				RefilterOutcome::Closed(CloseReason::NoMatches)
			}
			CompletionState::HasResults => {
				self.visible = self.matcher.filter(&self.items, self.filter.as_deref());
				if self.visible.is_empty() {
					self.close(CloseReason::NoMatches);
					return RefilterOutcome::Closed(CloseReason::NoMatches);
				}
				RefilterOutcome::Updated
			}
		}
	}

	/// Accepts the `index`-th visible item for insertion at `cursor` and closes.
	///
	/// The typed filter text is not inserted again: everything up to and including
	/// its first occurrence in the item's text is dropped. Returns `None` if no
	/// results are shown or `index` is out of range.
	pub fn accept(&mut self, index: usize, cursor: usize) -> Option<Acceptance> {
		if self.state != CompletionState::HasResults {
			return None;
		}
		let item = &self.items[*self.visible.get(index)?];
		let full = insert_text(item);
		let text = match self.filter.as_deref() {
			Some(filter) => strip_through(full, filter),
			None => full,
		}
		.to_string();
		let selection = first_placeholder(&text).map(|r| cursor + r.start..cursor + r.end);

		self.close(CloseReason::Accepted);
		Some(Acceptance { at: cursor, text, selection })
	}

	/// Closes the session. Returns false if it was already closed.
	pub fn close(&mut self, reason: CloseReason) -> bool {
		if self.state == CompletionState::Closed {
			return false;
		}
		tracing::trace!(id = self.id, ?reason, "lsp.completion.close");
		self.state = CompletionState::Closed;
		self.close_reason = Some(reason);
		true
	}
}

/// Returns `text` after the first occurrence of `needle`.
///
/// Falls back to a case-insensitive search, and to the whole `text` when the
/// needle does not occur.
fn strip_through<'a>(text: &'a str, needle: &str) -> &'a str {
	if let Some(pos) = text.find(needle) {
		return &text[pos + needle.len()..];
	}
	let needle_len = needle.chars().count();
	for (start, _) in text.char_indices() {
		let mut chars = text[start..].char_indices();
		let matched = needle.chars().all(|n| chars.next().is_some_and(|(_, c)| c.to_lowercase().eq(n.to_lowercase())));
		if matched {
			let end = text[start..].char_indices().nth(needle_len).map_or(text.len(), |(i, _)| start + i);
			return &text[end..];
		}
	}
	text
}
