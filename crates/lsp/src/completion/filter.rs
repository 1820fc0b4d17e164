//! Fuzzy filtering of cached completion items.

use lsp_types::{CompletionItem, CompletionTextEdit};
use nucleo::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo::{Config, Matcher, Utf32Str};

/// Text an item is matched against: `filter_text`, falling back to `label`.
pub fn filter_key(item: &CompletionItem) -> &str {
	item.filter_text.as_deref().unwrap_or(&item.label)
}

/// Text inserted when an item is accepted: `insert_text`, then the text edit's
/// new text, then `label`.
pub fn insert_text(item: &CompletionItem) -> &str {
	if let Some(text) = item.insert_text.as_deref() {
		return text;
	}
	match &item.text_edit {
		Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
		Some(CompletionTextEdit::InsertAndReplace(edit)) => &edit.new_text,
		None => &item.label,
	}
}

/// Reusable fuzzy matcher over completion items.
pub struct CompletionFilter {
	matcher: Matcher,
	buf: Vec<char>,
}

impl Default for CompletionFilter {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for CompletionFilter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CompletionFilter").finish_non_exhaustive()
	}
}

impl CompletionFilter {
	/// Creates a filter with the default matcher configuration.
	pub fn new() -> Self {
		Self {
			matcher: Matcher::new(Config::DEFAULT),
			buf: Vec::new(),
		}
	}

	/// Indices of `items` matching `query`, best match first.
	///
	/// Matching is a case-insensitive subsequence match, so every item matching a
	/// query also matches each of its prefixes. Ties keep server order. A missing
	/// or empty query keeps every item in server order.
	pub fn filter(&mut self, items: &[CompletionItem], query: Option<&str>) -> Vec<usize> {
		let Some(query) = query.filter(|q| !q.is_empty()) else {
			return (0..items.len()).collect();
		};
		let atom = Atom::new(query, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy, false);

		let mut scored: Vec<(usize, u16)> = items
			.iter()
			.enumerate()
			.filter_map(|(idx, item)| {
				atom.score(Utf32Str::new(filter_key(item), &mut self.buf), &mut self.matcher)
					.map(|score| (idx, score))
			})
			.collect();
		scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
		scored.into_iter().map(|(idx, _)| idx).collect()
	}
}
