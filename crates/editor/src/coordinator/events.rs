use stride_lsp::completion::{CloseReason, CompletionResponseEvent};
use stride_lsp::lsp_types::CompletionItem;

use crate::highlight::HighlightResult;

/// Work finished off the UI thread, waiting to be applied by the coordinator.
#[derive(Debug)]
pub enum CoordinatorEvent {
	/// A completion response (or failure).
	Completion(CompletionResponseEvent),
	/// A highlight pass finished.
	Highlight(HighlightResult),
}

/// What the completion popover should do.
#[derive(Debug, Clone)]
pub enum PopoverEvent {
	/// Results arrived; show the popover anchored at char offset `anchor`.
	Show {
		/// Request id.
		id: u64,
		/// Origin of the request.
		anchor: usize,
		/// Visible items, best first.
		items: Vec<CompletionItem>,
	},
	/// The visible items changed after re-filtering.
	Update {
		/// Request id.
		id: u64,
		/// Visible items, best first.
		items: Vec<CompletionItem>,
	},
	/// The popover for `id` should close.
	Close {
		/// Request id.
		id: u64,
		/// Why.
		reason: CloseReason,
	},
}

impl PopoverEvent {
	/// Request id the event refers to.
	pub fn id(&self) -> u64 {
		match self {
			Self::Show { id, .. } | Self::Update { id, .. } | Self::Close { id, .. } => *id,
		}
	}
}
