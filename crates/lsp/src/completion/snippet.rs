//! Placeholder markers in inserted completion text.
//!
//! Markers look like `${1:value}` and are inserted verbatim; the first one becomes
//! the selection after a completion is accepted so the user can type over it.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{.*?\}").expect("valid marker regex"));

/// Char range of the first placeholder marker in `text`.
pub fn first_placeholder(text: &str) -> Option<Range<usize>> {
	let m = MARKER.find(text)?;
	let start = text[..m.start()].chars().count();
	Some(start..start + m.as_str().chars().count())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn first_marker_wins() {
		let text = "insert(${1:value}, at: ${2:index})";
		assert_eq!(first_placeholder(text), Some(7..17));
	}

	#[test]
	fn ranges_are_in_chars() {
		let text = "\u{00E9}(${1:x})";
		assert_eq!(first_placeholder(text), Some(2..8));
	}

	#[test]
	fn plain_text_has_no_markers() {
		assert_eq!(first_placeholder("byteSwapped"), None);
		assert_eq!(first_placeholder("$notamarker}"), None);
	}
}
