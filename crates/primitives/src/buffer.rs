//! Addressable text buffer and its edit-event seam.
//!
//! Consumers that mirror a buffer elsewhere (a language server, a highlighter)
//! implement [`BufferObserver`]. [`Buffer`] fires the observer synchronously
//! around every mutation:
//!
//! - [`BufferObserver::did_insert`] after text is inserted,
//! - [`BufferObserver::will_delete`] before text is removed (the text is still
//!   present, so the removed span can be measured),
//! - [`BufferObserver::did_delete`] after text is removed.

use std::ops::Range;

use ropey::Rope;

/// Read access to a buffer's text and cursor.
pub trait TextBuffer {
	/// Current text snapshot.
	fn text(&self) -> &Rope;

	/// Cursor char offset.
	fn cursor(&self) -> usize;
}

/// Receiver of buffer mutation events.
pub trait BufferObserver {
	/// `text` was inserted at `at`; `buffer` already contains it.
	fn did_insert(&mut self, buffer: &dyn TextBuffer, at: usize, text: &str);

	/// `count` chars at `at` are about to be removed; `buffer` still contains them.
	fn will_delete(&mut self, buffer: &dyn TextBuffer, at: usize, count: usize);

	/// `count` chars at `at` were removed.
	fn did_delete(&mut self, buffer: &dyn TextBuffer, at: usize, count: usize);
}

impl BufferObserver for () {
	fn did_insert(&mut self, _: &dyn TextBuffer, _: usize, _: &str) {}
	fn will_delete(&mut self, _: &dyn TextBuffer, _: usize, _: usize) {}
	fn did_delete(&mut self, _: &dyn TextBuffer, _: usize, _: usize) {}
}

/// Errors from buffer mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
	/// An offset or range end lies past the end of the text.
	#[error("offset {offset} out of bounds (len {len})")]
	OutOfBounds {
		/// Requested offset.
		offset: usize,
		/// Text length in chars.
		len: usize,
	},
}

/// Rope-backed buffer with a single cursor and optional selection.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
	text: Rope,
	cursor: usize,
	selection: Option<Range<usize>>,
}

impl TextBuffer for Buffer {
	fn text(&self) -> &Rope {
		&self.text
	}

	fn cursor(&self) -> usize {
		self.cursor
	}
}

impl Buffer {
	/// Creates a buffer with the cursor at the start.
	pub fn new(text: &str) -> Self {
		Self {
			text: Rope::from_str(text),
			cursor: 0,
			selection: None,
		}
	}

	/// Number of chars in the buffer.
	pub fn len_chars(&self) -> usize {
		self.text.len_chars()
	}

	/// Current selection, if any.
	pub fn selection(&self) -> Option<Range<usize>> {
		self.selection.clone()
	}

	/// Moves the cursor and clears the selection.
	pub fn set_cursor(&mut self, cursor: usize) -> Result<(), BufferError> {
		self.check(cursor)?;
		self.cursor = cursor;
		self.selection = None;
		Ok(())
	}

	/// Selects `range` and places the cursor at its end.
	pub fn select(&mut self, range: Range<usize>) -> Result<(), BufferError> {
		self.check(range.end)?;
		self.cursor = range.end;
		self.selection = Some(range);
		Ok(())
	}

	/// Replaces the whole text without emitting events.
	///
	/// Used when a document is (re)loaded rather than edited.
	pub fn reset(&mut self, text: &str) {
		self.text = Rope::from_str(text);
		self.cursor = self.cursor.min(self.text.len_chars());
		self.selection = None;
	}

	/// Inserts `text` at `at`, shifting the cursor if it sits at or after `at`.
	pub fn insert(&mut self, at: usize, text: &str, observer: &mut dyn BufferObserver) -> Result<(), BufferError> {
		self.check(at)?;
		if text.is_empty() {
			return Ok(());
		}
		self.text.insert(at, text);
		if self.cursor >= at {
			self.cursor += text.chars().count();
		}
		self.selection = None;
		observer.did_insert(&*self, at, text);
		Ok(())
	}

	/// Removes `count` chars at `at`.
	pub fn delete(&mut self, at: usize, count: usize, observer: &mut dyn BufferObserver) -> Result<(), BufferError> {
		self.check(at.saturating_add(count))?;
		if count == 0 {
			return Ok(());
		}
		observer.will_delete(&*self, at, count);
		self.text.remove(at..at + count);
		if self.cursor >= at + count {
			self.cursor -= count;
		} else if self.cursor > at {
			self.cursor = at;
		}
		self.selection = None;
		observer.did_delete(&*self, at, count);
		Ok(())
	}

	/// Inserts `text` at the cursor.
	pub fn type_text(&mut self, text: &str, observer: &mut dyn BufferObserver) -> Result<(), BufferError> {
		self.insert(self.cursor, text, observer)
	}

	/// Deletes the char before the cursor. No-op at the start of the buffer.
	pub fn backspace(&mut self, observer: &mut dyn BufferObserver) -> Result<(), BufferError> {
		match self.cursor.checked_sub(1) {
			Some(at) => self.delete(at, 1, observer),
			None => Ok(()),
		}
	}

	fn check(&self, offset: usize) -> Result<(), BufferError> {
		let len = self.text.len_chars();
		if offset > len {
			return Err(BufferError::OutOfBounds { offset, len });
		}
		Ok(())
	}
}
