use proptest::prelude::*;

use super::*;

#[test]
fn test_utf32_round_trip() {
	let text = Rope::from("hello\nworld\n");
	let encoding = OffsetEncoding::Utf32;

	let pos = Position { line: 0, character: 3 };
	let char_idx = lsp_position_to_char(&text, pos, encoding).unwrap();
	assert_eq!(char_idx, 3);
	assert_eq!(char_to_lsp_position(&text, char_idx, encoding).unwrap(), pos);

	let pos = Position { line: 1, character: 2 };
	let char_idx = lsp_position_to_char(&text, pos, encoding).unwrap();
	assert_eq!(char_idx, 8);
	assert_eq!(char_to_lsp_position(&text, char_idx, encoding).unwrap(), pos);
}

#[test]
fn test_utf16_with_emoji() {
	// U+1F600 is one char but two UTF-16 code units.
	let text = Rope::from("a\u{1F600}b\n");
	let encoding = OffsetEncoding::Utf16;

	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 1 }, encoding), Some(1));
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 3 }, encoding), Some(2));
	assert_eq!(char_to_lsp_position(&text, 2, encoding).unwrap().character, 3);
}

#[test]
fn test_unicode_separators_stay_on_their_line() {
	// Servers only split lines at \n, \r\n and \r.
	let text = Rope::from("a\u{2028}b\u{0085}c\nd");
	let encoding = OffsetEncoding::Utf16;

	assert_eq!(char_to_lsp_position(&text, 4, encoding), Some(Position { line: 0, character: 4 }));
	assert_eq!(char_to_lsp_position(&text, 6, encoding), Some(Position { line: 1, character: 0 }));
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 5 }, encoding), Some(5));
	assert_eq!(lsp_position_to_char(&text, Position { line: 1, character: 1 }, encoding), Some(7));
}

#[test]
fn test_utf16_mid_surrogate_is_rejected() {
	let text = Rope::from("a\u{1F600}b");
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 2 }, OffsetEncoding::Utf16), None);
}

#[test]
fn test_utf8_with_multibyte() {
	let text = Rope::from("caf\u{00E9}!\n");
	let encoding = OffsetEncoding::Utf8;

	assert_eq!(char_to_lsp_position(&text, 3, encoding).unwrap().character, 3);
	assert_eq!(char_to_lsp_position(&text, 4, encoding).unwrap().character, 5);
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 5 }, encoding), Some(4));
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 4 }, encoding), None);
}

#[test]
fn test_end_of_line_is_valid_past_it_is_not() {
	let text = Rope::from("ab\ncd");
	let encoding = OffsetEncoding::Utf16;

	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 2 }, encoding), Some(2));
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 3 }, encoding), None);
	assert_eq!(lsp_position_to_char(&text, Position { line: 1, character: 2 }, encoding), Some(5));
	assert_eq!(lsp_position_to_char(&text, Position { line: 2, character: 0 }, encoding), None);
}

#[test]
fn test_crlf_line_end() {
	let text = Rope::from("ab\r\ncd");
	let encoding = OffsetEncoding::Utf16;

	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 2 }, encoding), Some(2));
	assert_eq!(lsp_position_to_char(&text, Position { line: 0, character: 3 }, encoding), None);
	assert_eq!(char_to_lsp_position(&text, 4, encoding), Some(Position { line: 1, character: 0 }));
}

#[test]
fn test_offset_past_end() {
	let text = Rope::from("abc");
	assert_eq!(char_to_lsp_position(&text, 3, OffsetEncoding::Utf16), Some(Position { line: 0, character: 3 }));
	assert_eq!(char_to_lsp_position(&text, 4, OffsetEncoding::Utf16), None);
}

#[test]
fn test_trailing_newline_has_empty_last_line() {
	let text = Rope::from("abc\n");
	let encoding = OffsetEncoding::Utf16;
	assert_eq!(char_to_lsp_position(&text, 4, encoding), Some(Position { line: 1, character: 0 }));
	assert_eq!(lsp_position_to_char(&text, Position { line: 1, character: 0 }, encoding), Some(4));
}

#[test]
fn test_range_conversion() {
	let text = Rope::from("let x\u{1F600} = 1;\nfoo.bar");
	let encoding = OffsetEncoding::Utf16;

	let range = char_range_to_lsp_range(&text, 4, 9, encoding).unwrap();
	assert_eq!(range.start, Position { line: 0, character: 4 });
	assert_eq!(range.end, Position { line: 0, character: 10 });
	assert_eq!(lsp_range_to_char_range(&text, range, encoding), Some(4..9));

	let inverted = LspRange {
		start: range.end,
		end: range.start,
	};
	assert_eq!(lsp_range_to_char_range(&text, inverted, encoding), None);
}

fn encodings() -> impl Strategy<Value = OffsetEncoding> {
	prop_oneof![Just(OffsetEncoding::Utf8), Just(OffsetEncoding::Utf16), Just(OffsetEncoding::Utf32)]
}

proptest! {
	#[test]
	fn every_char_boundary_round_trips(
		source in "[a-z \u{00E9}\u{4E2D}\u{1F600}\n]{0,48}",
		pick in 0usize..64,
		encoding in encodings(),
	) {
		let text = Rope::from(source.as_str());
		let char_idx = pick % (text.len_chars() + 1);
		let pos = char_to_lsp_position(&text, char_idx, encoding).unwrap();
		prop_assert_eq!(lsp_position_to_char(&text, pos, encoding), Some(char_idx));
	}

	#[test]
	fn positions_are_monotonic(
		source in "[a-z\u{1F600}\n]{1,32}",
		encoding in encodings(),
	) {
		let text = Rope::from(source.as_str());
		let mut prev = char_to_lsp_position(&text, 0, encoding).unwrap();
		for idx in 1..=text.len_chars() {
			let pos = char_to_lsp_position(&text, idx, encoding).unwrap();
			prop_assert!(pos > prev);
			prev = pos;
		}
	}
}
