/// A single buffer mutation, addressed in char offsets of the text it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
	/// Insert `text` before the char at `at`.
	Insert {
		/// Insertion offset.
		at: usize,
		/// Inserted text.
		text: String,
	},
	/// Remove `count` chars starting at `at`.
	Delete {
		/// First removed offset.
		at: usize,
		/// Number of removed chars.
		count: usize,
	},
}

impl Edit {
	/// Creates an insertion.
	pub fn insert(at: usize, text: impl Into<String>) -> Self {
		Self::Insert { at, text: text.into() }
	}

	/// Creates a deletion.
	pub fn delete(at: usize, count: usize) -> Self {
		Self::Delete { at, count }
	}

	/// Returns true for edits that change nothing.
	pub fn is_noop(&self) -> bool {
		match self {
			Self::Insert { text, .. } => text.is_empty(),
			Self::Delete { count, .. } => *count == 0,
		}
	}
}
