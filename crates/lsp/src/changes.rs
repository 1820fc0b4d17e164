//! Encoding of buffer edits as `didChange` content changes.

use lsp_types::TextDocumentContentChangeEvent;
use ropey::Rope;
use stride_primitives::Edit;

use crate::capabilities::SyncMode;
use crate::client::OffsetEncoding;
use crate::position::{char_range_to_lsp_range, char_to_lsp_position};

/// Encodes one edit for the given sync mode.
///
/// `text` must be the buffer state in which the edit's span is present: after
/// the insertion for [`Edit::Insert`], before the removal for [`Edit::Delete`].
/// These are exactly the states observed by `did_insert` and `will_delete`.
///
/// In [`SyncMode::Full`] the event carries the whole document as it is after the
/// edit. In [`SyncMode::Incremental`] it carries a ranged change in pre-edit
/// coordinates. Returns `None` in [`SyncMode::None`], for no-op edits, and when
/// either endpoint cannot be translated.
pub fn encode_change(text: &Rope, edit: &Edit, mode: SyncMode, encoding: OffsetEncoding) -> Option<TextDocumentContentChangeEvent> {
	if edit.is_noop() {
		return None;
	}
	match mode {
		SyncMode::None => None,
		SyncMode::Full => match edit {
			Edit::Insert { .. } => Some(full_change(text)),
			Edit::Delete { at, count } => {
				let end = at.checked_add(*count).filter(|end| *end <= text.len_chars())?;
				let mut after = text.clone();
				after.remove(*at..end);
				Some(full_change(&after))
			}
		},
		SyncMode::Incremental => match edit {
			Edit::Insert { at, text: inserted } => {
				if at.checked_add(inserted.chars().count()).is_none_or(|end| end > text.len_chars()) {
					return None;
				}
				let pos = char_to_lsp_position(text, *at, encoding)?;
				Some(TextDocumentContentChangeEvent {
					range: Some(lsp_types::Range { start: pos, end: pos }),
					range_length: None,
					text: inserted.clone(),
				})
			}
			Edit::Delete { at, count } => {
				let range = char_range_to_lsp_range(text, *at, at.checked_add(*count)?, encoding)?;
				Some(TextDocumentContentChangeEvent {
					range: Some(range),
					range_length: None,
					text: String::new(),
				})
			}
		},
	}
}

/// A whole-document change carrying `text`.
pub fn full_change(text: &Rope) -> TextDocumentContentChangeEvent {
	TextDocumentContentChangeEvent {
		range: None,
		range_length: None,
		text: text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use lsp_types::{Position, Range};
	use pretty_assertions::assert_eq;

	use super::*;

	fn pos(line: u32, character: u32) -> Position {
		Position { line, character }
	}

	#[test]
	fn incremental_insert_is_zero_width_at_insertion_point() {
		let text = Rope::from("foo.\nbar");
		let event = encode_change(&text, &Edit::insert(3, "."), SyncMode::Incremental, OffsetEncoding::Utf16).unwrap();
		assert_eq!(event.range, Some(Range { start: pos(0, 3), end: pos(0, 3) }));
		assert_eq!(event.text, ".");
		assert_eq!(event.range_length, None);
	}

	#[test]
	fn incremental_delete_spans_translated_endpoints() {
		let text = Rope::from("ab\u{1F600}cdef\nxyz");
		let event = encode_change(&text, &Edit::delete(1, 3), SyncMode::Incremental, OffsetEncoding::Utf16).unwrap();
		assert_eq!(event.range, Some(Range { start: pos(0, 1), end: pos(0, 5) }));
		assert_eq!(event.text, "");
	}

	#[test]
	fn incremental_delete_across_lines() {
		let text = Rope::from("one\ntwo");
		let event = encode_change(&text, &Edit::delete(2, 3), SyncMode::Incremental, OffsetEncoding::Utf16).unwrap();
		assert_eq!(event.range, Some(Range { start: pos(0, 2), end: pos(1, 1) }));
	}

	#[test]
	fn full_mode_carries_post_edit_document() {
		let text = Rope::from("hello world");
		let event = encode_change(&text, &Edit::delete(5, 6), SyncMode::Full, OffsetEncoding::Utf16).unwrap();
		assert_eq!(event.range, None);
		assert_eq!(event.text, "hello");

		let event = encode_change(&text, &Edit::insert(5, " world"), SyncMode::Full, OffsetEncoding::Utf16).unwrap();
		assert_eq!(event.text, "hello world");
	}

	#[test]
	fn none_mode_and_noops_encode_nothing() {
		let text = Rope::from("abc");
		assert!(encode_change(&text, &Edit::insert(1, "x"), SyncMode::None, OffsetEncoding::Utf16).is_none());
		assert!(encode_change(&text, &Edit::delete(1, 0), SyncMode::Incremental, OffsetEncoding::Utf16).is_none());
	}

	#[test]
	fn untranslatable_edits_encode_nothing() {
		let text = Rope::from("abc");
		assert!(encode_change(&text, &Edit::delete(2, 5), SyncMode::Incremental, OffsetEncoding::Utf16).is_none());
		assert!(encode_change(&text, &Edit::insert(3, "zz"), SyncMode::Incremental, OffsetEncoding::Utf16).is_none());
		assert!(encode_change(&text, &Edit::delete(2, 5), SyncMode::Full, OffsetEncoding::Utf16).is_none());
	}
}
