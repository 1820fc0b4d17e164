//! Conversion between rope char offsets and LSP positions.
//!
//! Columns are measured by re-scanning the line in the negotiated encoding, so
//! astral-plane characters and multi-byte UTF-8 sequences are counted correctly.
//! Nothing is clamped: an offset or position that does not land on a char
//! boundary inside the document yields `None`.

use std::ops::Range;

use lsp_types::{Position, Range as LspRange};
use ropey::Rope;
use stride_primitives::rope::line_content_end;

use crate::client::OffsetEncoding;

/// Converts a char index to an LSP position.
///
/// Returns `None` if `char_idx` is past the end of the document.
pub fn char_to_lsp_position(text: &Rope, char_idx: usize, encoding: OffsetEncoding) -> Option<Position> {
	if char_idx > text.len_chars() {
		return None;
	}
	let line = text.char_to_line(char_idx);
	let line_start = text.line_to_char(line);
	let column: usize = text.slice(line_start..char_idx).chars().map(|ch| encoding.units(ch)).sum();
	Some(Position {
		line: u32::try_from(line).ok()?,
		character: u32::try_from(column).ok()?,
	})
}

/// Converts an LSP position to a char index.
///
/// Returns `None` if the line does not exist, the column is past the end of the
/// line's content, or the column falls inside a multi-unit character.
pub fn lsp_position_to_char(text: &Rope, position: Position, encoding: OffsetEncoding) -> Option<usize> {
	let line = position.line as usize;
	let content_end = line_content_end(text.slice(..), line)?;
	let line_start = text.line_to_char(line);
	let target = position.character as usize;

	let mut units = 0usize;
	for (i, ch) in text.slice(line_start..content_end).chars().enumerate() {
		if units == target {
			return Some(line_start + i);
		}
		units += encoding.units(ch);
		if units > target {
			return None;
		}
	}
	(units == target).then_some(content_end)
}

/// Converts a char range to an LSP range.
pub fn char_range_to_lsp_range(text: &Rope, start: usize, end: usize, encoding: OffsetEncoding) -> Option<LspRange> {
	Some(LspRange {
		start: char_to_lsp_position(text, start, encoding)?,
		end: char_to_lsp_position(text, end, encoding)?,
	})
}

/// Converts an LSP range to a char range.
pub fn lsp_range_to_char_range(text: &Rope, range: LspRange, encoding: OffsetEncoding) -> Option<Range<usize>> {
	let start = lsp_position_to_char(text, range.start, encoding)?;
	let end = lsp_position_to_char(text, range.end, encoding)?;
	(start <= end).then_some(start..end)
}

#[cfg(test)]
mod tests;
