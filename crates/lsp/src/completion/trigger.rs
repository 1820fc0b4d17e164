//! Completion trigger detection.
//!
//! A [`TriggerSet`] holds the server-advertised trigger strings plus the manual
//! key chord. It answers two questions about a cursor: where the word being
//! completed starts ([`TriggerSet::trigger_position`]), and what the user has
//! typed since then ([`TriggerSet::filter_text`]).

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use ropey::RopeSlice;
use stride_primitives::rope::line_start_of;

bitflags! {
	/// Modifier keys held with a chord.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Modifiers: u8 {
		/// Control.
		const CTRL = 1 << 0;
		/// Alt / option.
		const ALT = 1 << 1;
		/// Shift.
		const SHIFT = 1 << 2;
		/// Super / command.
		const SUPER = 1 << 3;
	}
}

/// A key press with modifiers, e.g. `ctrl+space`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
	/// Held modifiers.
	pub modifiers: Modifiers,
	/// The pressed key.
	pub key: char,
}

impl KeyChord {
	/// A chord with no modifiers.
	pub const fn plain(key: char) -> Self {
		Self {
			modifiers: Modifiers::empty(),
			key,
		}
	}

	/// A chord with modifiers.
	pub const fn new(modifiers: Modifiers, key: char) -> Self {
		Self { modifiers, key }
	}
}

impl Default for KeyChord {
	fn default() -> Self {
		Self::new(Modifiers::CTRL, ' ')
	}
}

/// Errors from parsing a [`KeyChord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordParseError {
	/// The input was empty.
	#[error("empty key chord")]
	Empty,
	/// A modifier name was not recognized.
	#[error("unknown modifier `{0}`")]
	UnknownModifier(String),
	/// The key name was not recognized.
	#[error("unknown key `{0}`")]
	UnknownKey(String),
}

impl FromStr for KeyChord {
	type Err = ChordParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ChordParseError::Empty);
		}
		// A bare "+" is the plus key, not a separator.
		let (mods, key) = match s.rsplit_once('+') {
			Some((mods, "")) => (mods.strip_suffix('+').unwrap_or(mods), "+"),
			Some((mods, key)) => (mods, key),
			None => ("", s),
		};

		let mut modifiers = Modifiers::empty();
		for name in mods.split('+').filter(|m| !m.is_empty()) {
			modifiers |= match name.to_ascii_lowercase().as_str() {
				"ctrl" | "control" => Modifiers::CTRL,
				"alt" | "option" => Modifiers::ALT,
				"shift" => Modifiers::SHIFT,
				"super" | "cmd" | "command" => Modifiers::SUPER,
				_ => return Err(ChordParseError::UnknownModifier(name.to_string())),
			};
		}

		let key = match key.to_ascii_lowercase().as_str() {
			"space" => ' ',
			"tab" => '\t',
			"enter" | "return" => '\n',
			_ => {
				let mut chars = key.chars();
				match (chars.next(), chars.next()) {
					(Some(ch), None) => ch,
					_ => return Err(ChordParseError::UnknownKey(key.to_string())),
				}
			}
		};
		Ok(Self { modifiers, key })
	}
}

impl fmt::Display for KeyChord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (name, flag) in [("ctrl", Modifiers::CTRL), ("alt", Modifiers::ALT), ("shift", Modifiers::SHIFT), ("super", Modifiers::SUPER)] {
			if self.modifiers.contains(flag) {
				write!(f, "{name}+")?;
			}
		}
		match self.key {
			' ' => f.write_str("space"),
			'\t' => f.write_str("tab"),
			'\n' => f.write_str("enter"),
			ch => write!(f, "{ch}"),
		}
	}
}

/// Trigger strings and the manual completion chord for one document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerSet {
	characters: Vec<String>,
	manual: KeyChord,
}

impl TriggerSet {
	/// Creates a set from server trigger strings; empty strings are dropped.
	pub fn new<I, S>(characters: I, manual: KeyChord) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			characters: characters.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect(),
			manual,
		}
	}

	/// Server trigger strings.
	pub fn characters(&self) -> &[String] {
		&self.characters
	}

	/// The manual chord.
	pub fn manual(&self) -> KeyChord {
		self.manual
	}

	/// Whether typing can start completion on its own.
	pub fn is_automatic(&self) -> bool {
		!self.characters.is_empty()
	}

	/// Whether `key` is the manual chord.
	pub fn is_manual(&self, key: &KeyChord) -> bool {
		*key == self.manual
	}

	/// The trigger string that the text right before `cursor` ends with, if any.
	///
	/// Prefers the longest match, so `::` wins over `:` when both are registered.
	pub fn trigger_ending_at(&self, text: RopeSlice, cursor: usize) -> Option<&str> {
		if cursor > text.len_chars() {
			return None;
		}
		self.characters
			.iter()
			.filter(|t| {
				let len = t.chars().count();
				cursor >= len && text.slice(cursor - len..cursor) == t.as_str()
			})
			.max_by_key(|t| t.chars().count())
			.map(String::as_str)
	}

	/// Start offset of the word being completed at `cursor`.
	///
	/// The cursor itself when it is at the buffer start or right after whitespace
	/// or a single-char trigger. Otherwise one past the nearest trigger char to
	/// the left on the same line, or the line start when there is none.
	/// Whitespace inside the line does not stop that scan. Returns `None` only
	/// when `cursor` is out of bounds.
	pub fn trigger_position(&self, text: RopeSlice, cursor: usize) -> Option<usize> {
		let line_start = line_start_of(text, cursor)?;
		if cursor == 0 {
			return Some(0);
		}
		let prev = text.char(cursor - 1);
		if prev.is_whitespace() || self.is_single_char_trigger(prev) {
			return Some(cursor);
		}
		let found = (line_start..cursor).rev().find(|&idx| self.ends_trigger(text.char(idx)));
		Some(found.map_or(line_start, |idx| idx + 1))
	}

	/// Text typed between the trigger position and `cursor`, with trigger chars
	/// and whitespace trimmed from both ends. `None` when nothing remains.
	pub fn filter_text(&self, text: RopeSlice, cursor: usize) -> Option<String> {
		let start = self.trigger_position(text, cursor)?;
		if start >= cursor {
			return None;
		}
		let raw = text.slice(start..cursor).to_string();
		let trimmed = raw.trim_matches(|ch: char| ch.is_whitespace() || self.contains_char(ch));
		(!trimmed.is_empty()).then(|| trimmed.to_string())
	}

	fn is_single_char_trigger(&self, ch: char) -> bool {
		self.characters.iter().any(|t| {
			let mut chars = t.chars();
			chars.next() == Some(ch) && chars.next().is_none()
		})
	}

	fn ends_trigger(&self, ch: char) -> bool {
		self.characters.iter().any(|t| t.ends_with(ch))
	}

	fn contains_char(&self, ch: char) -> bool {
		self.characters.iter().any(|t| t.contains(ch))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use ropey::Rope;

	use super::*;

	fn swift() -> TriggerSet {
		TriggerSet::new([".", "::"], KeyChord::default())
	}

	fn position(text: &str, cursor: usize) -> Option<usize> {
		swift().trigger_position(Rope::from(text).slice(..), cursor)
	}

	fn filter(text: &str, cursor: usize) -> Option<String> {
		swift().filter_text(Rope::from(text).slice(..), cursor)
	}

	#[test]
	fn cursor_right_after_trigger() {
		assert_eq!(position("foo.bar", 4), Some(4));
	}

	#[test]
	fn cursor_inside_word_after_trigger() {
		assert_eq!(position("foo.bar", 6), Some(4));
		assert_eq!(position("foo.bar", 7), Some(4));
	}

	#[test]
	fn buffer_start() {
		assert_eq!(position("foo", 0), Some(0));
		assert_eq!(position("", 0), Some(0));
	}

	#[test]
	fn after_whitespace_is_cursor() {
		assert_eq!(position("let x = ", 8), Some(8));
		assert_eq!(position("a\n", 2), Some(2));
	}

	#[test]
	fn no_trigger_on_line_falls_back_to_line_start() {
		assert_eq!(position("foo.x\nbar", 9), Some(6));
		assert_eq!(position("identifier", 5), Some(0));
	}

	#[test]
	fn scan_skips_whitespace_inside_the_line() {
		assert_eq!(position("let x = fo", 10), Some(0));
		assert_eq!(position("a.b c", 5), Some(2));
		assert_eq!(filter("a.b c", 5), Some("b c".to_string()));
	}

	#[test]
	fn multi_char_trigger_matches_by_last_char() {
		assert_eq!(position("Foo::ba", 7), Some(5));
		assert_eq!(position("Foo::", 5), Some(5));
	}

	#[test]
	fn out_of_bounds_cursor() {
		assert_eq!(position("abc", 4), None);
	}

	#[test]
	fn manual_chord_does_not_participate() {
		let set = TriggerSet::new(Vec::<String>::new(), KeyChord::new(Modifiers::CTRL, 'x'));
		assert_eq!(set.trigger_position(Rope::from("axb").slice(..), 3), Some(0));
	}

	#[test]
	fn filter_text_is_typed_prefix() {
		assert_eq!(filter("foo.byt", 7), Some("byt".to_string()));
		assert_eq!(filter("foo.", 4), None);
		assert_eq!(filter("x = ", 4), None);
		assert_eq!(filter("Foo::ne", 7), Some("ne".to_string()));
	}

	#[test]
	fn trigger_ending_at_prefers_longest() {
		let set = TriggerSet::new([":", "::", "."], KeyChord::default());
		let text = Rope::from("Foo::");
		assert_eq!(set.trigger_ending_at(text.slice(..), 5), Some("::"));
		assert_eq!(set.trigger_ending_at(text.slice(..), 4), Some(":"));
		assert_eq!(set.trigger_ending_at(text.slice(..), 3), None);
	}

	#[test]
	fn chord_parsing() {
		assert_eq!("ctrl+space".parse(), Ok(KeyChord::new(Modifiers::CTRL, ' ')));
		assert_eq!("Ctrl+Alt+n".parse(), Ok(KeyChord::new(Modifiers::CTRL | Modifiers::ALT, 'n')));
		assert_eq!(".".parse(), Ok(KeyChord::plain('.')));
		assert_eq!("ctrl++".parse(), Ok(KeyChord::new(Modifiers::CTRL, '+')));
		assert_eq!("hyper+x".parse::<KeyChord>(), Err(ChordParseError::UnknownModifier("hyper".into())));
		assert_eq!("ctrl+escape".parse::<KeyChord>(), Err(ChordParseError::UnknownKey("escape".into())));
		assert_eq!("".parse::<KeyChord>(), Err(ChordParseError::Empty));
	}

	#[test]
	fn chord_display_round_trips() {
		for chord in ["ctrl+space", "ctrl+alt+n", "tab", "super+."] {
			assert_eq!(chord.parse::<KeyChord>().unwrap().to_string(), chord);
		}
	}
}
