use std::collections::BTreeMap;

use stride_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};

/// Gutter rank for a severity: error 4, warning 3, information 2, hint 1, unset 0.
pub fn severity_rank(severity: Option<DiagnosticSeverity>) -> u8 {
	match severity {
		Some(DiagnosticSeverity::ERROR) => 4,
		Some(DiagnosticSeverity::WARNING) => 3,
		Some(DiagnosticSeverity::INFORMATION) => 2,
		Some(DiagnosticSeverity::HINT) => 1,
		_ => 0,
	}
}

/// Published diagnostics grouped by line.
///
/// A diagnostic spanning several lines is listed under its start line and its
/// end line, once when they coincide.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsByLine {
	lines: BTreeMap<u32, Vec<Diagnostic>>,
	total: usize,
}

impl DiagnosticsByLine {
	/// Groups `diagnostics` by line.
	pub fn new(diagnostics: &[Diagnostic]) -> Self {
		let mut lines: BTreeMap<u32, Vec<Diagnostic>> = BTreeMap::new();
		for diag in diagnostics {
			let start = diag.range.start.line;
			let end = diag.range.end.line;
			lines.entry(start).or_default().push(diag.clone());
			if end != start {
				lines.entry(end).or_default().push(diag.clone());
			}
		}
		Self {
			lines,
			total: diagnostics.len(),
		}
	}

	/// Diagnostics listed under `line`.
	pub fn line(&self, line: u32) -> &[Diagnostic] {
		self.lines.get(&line).map_or(&[], Vec::as_slice)
	}

	/// Lines with at least one diagnostic, ascending.
	pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
		self.lines.keys().copied()
	}

	/// Whether nothing was published.
	pub fn is_empty(&self) -> bool {
		self.total == 0
	}

	/// Number of distinct diagnostics with error severity.
	pub fn error_count(&self) -> usize {
		self.count(DiagnosticSeverity::ERROR)
	}

	/// Number of distinct diagnostics with warning severity.
	pub fn warning_count(&self) -> usize {
		self.count(DiagnosticSeverity::WARNING)
	}

	/// Highest severity on `line`, if any diagnostic there has one.
	pub fn highest_severity(&self, line: u32) -> Option<DiagnosticSeverity> {
		self.line(line).iter().filter_map(|d| d.severity).max_by_key(|s| severity_rank(Some(*s)))
	}

	fn count(&self, severity: DiagnosticSeverity) -> usize {
		// Multi-line diagnostics appear twice; count them at their start line only.
		self.lines
			.iter()
			.flat_map(|(line, diags)| diags.iter().filter(move |d| d.range.start.line == *line))
			.filter(|d| d.severity == Some(severity))
			.count()
	}
}
