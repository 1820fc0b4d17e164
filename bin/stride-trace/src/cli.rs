use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use stride_lsp::lsp_types::TextDocumentSyncKind;

#[derive(Parser, Debug)]
#[command(name = "stride-trace")]
#[command(about = "Replay an edit script and print the language server traffic it produces")]
#[command(version)]
pub struct Cli {
	/// File to open
	pub file: PathBuf,
	/// Edit script, one command per line
	#[arg(long)]
	pub script: PathBuf,
	/// Document sync kind the simulated server advertises
	#[arg(long, value_enum, default_value_t = SyncArg::Incremental)]
	pub sync: SyncArg,
	/// Completion trigger string the simulated server advertises (repeatable)
	#[arg(long = "trigger", value_name = "CHAR")]
	pub triggers: Vec<String>,
	/// Language id sent with didOpen, overriding the config
	#[arg(long, value_name = "ID")]
	pub language: Option<String>,
	/// Editor config file
	#[arg(long, value_name = "PATH")]
	pub config: Option<PathBuf>,
	/// JSON array of completion items the simulated server answers with
	#[arg(long, value_name = "PATH")]
	pub items: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SyncArg {
	None,
	Full,
	Incremental,
}

impl From<SyncArg> for TextDocumentSyncKind {
	fn from(arg: SyncArg) -> Self {
		match arg {
			SyncArg::None => TextDocumentSyncKind::NONE,
			SyncArg::Full => TextDocumentSyncKind::FULL,
			SyncArg::Incremental => TextDocumentSyncKind::INCREMENTAL,
		}
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_is_well_formed() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_repeated_triggers() {
		let cli = Cli::try_parse_from(["stride-trace", "main.swift", "--script", "s.txt", "--sync", "full", "--trigger", ".", "--trigger", "::"]).unwrap();
		assert_eq!(cli.sync, SyncArg::Full);
		assert_eq!(cli.triggers, vec![".", "::"]);
		assert_eq!(TextDocumentSyncKind::from(cli.sync), TextDocumentSyncKind::FULL);
	}
}
