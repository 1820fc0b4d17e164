//! Rope utilities and extensions.

use ropey::RopeSlice;

/// Returns true for the line breaks the workspace's ropey build counts.
///
/// Ropey is built with `cr_lines` only, which matches LSP: `\n`, `\r\n` and
/// `\r`. Unicode separators such as U+2028 stay inside their line.
#[inline]
pub fn is_line_break(ch: char) -> bool {
	matches!(ch, '\n' | '\r')
}

/// Returns the char index one past the last non-break char of `line`.
///
/// Returns `None` if `line` is out of bounds.
pub fn line_content_end(text: RopeSlice, line: usize) -> Option<usize> {
	if line >= text.len_lines() {
		return None;
	}
	let start = text.line_to_char(line);
	let slice = text.line(line);
	let mut len = slice.len_chars();
	if len >= 2 && slice.char(len - 2) == '\r' && slice.char(len - 1) == '\n' {
		len -= 2;
	} else if len >= 1 && is_line_break(slice.char(len - 1)) {
		len -= 1;
	}
	Some(start + len)
}

/// Returns the char index where the line containing `char_idx` starts.
///
/// Returns `None` if `char_idx` is past the end of the text.
pub fn line_start_of(text: RopeSlice, char_idx: usize) -> Option<usize> {
	if char_idx > text.len_chars() {
		return None;
	}
	Some(text.line_to_char(text.char_to_line(char_idx)))
}

#[cfg(test)]
mod tests {
	use ropey::Rope;

	use super::*;

	#[test]
	fn test_content_end_strips_lf() {
		let text = Rope::from("hello\nworld");
		assert_eq!(line_content_end(text.slice(..), 0), Some(5));
		assert_eq!(line_content_end(text.slice(..), 1), Some(11));
	}

	#[test]
	fn test_content_end_strips_crlf() {
		let text = Rope::from("ab\r\ncd\r\n");
		assert_eq!(line_content_end(text.slice(..), 0), Some(2));
		assert_eq!(line_content_end(text.slice(..), 1), Some(6));
		assert_eq!(line_content_end(text.slice(..), 2), Some(8));
	}

	#[test]
	fn test_content_end_out_of_bounds() {
		let text = Rope::from("one line");
		assert_eq!(line_content_end(text.slice(..), 1), None);
	}

	#[test]
	fn test_unicode_separators_are_not_line_breaks() {
		let text = Rope::from("a\u{2028}b\u{0085}c\u{000C}d\re");
		assert_eq!(text.len_lines(), 2);
		assert_eq!(line_content_end(text.slice(..), 0), Some(7));
		assert_eq!(line_start_of(text.slice(..), 9), Some(8));
	}

	#[test]
	fn test_line_start_of() {
		let text = Rope::from("foo\nbar.baz");
		assert_eq!(line_start_of(text.slice(..), 0), Some(0));
		assert_eq!(line_start_of(text.slice(..), 3), Some(0));
		assert_eq!(line_start_of(text.slice(..), 4), Some(4));
		assert_eq!(line_start_of(text.slice(..), 11), Some(4));
		assert_eq!(line_start_of(text.slice(..), 12), None);
	}
}
