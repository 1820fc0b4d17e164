//! Editor configuration loaded from TOML.
//!
//! ```toml
//! [sync]
//! full_sync_interval_ms = 1000
//! send_did_save = true
//!
//! [completion]
//! manual_trigger = "ctrl+space"
//! typing_debounce_ms = 0
//!
//! [highlight]
//! command = "stride-highlight"
//! args = ["--json"]
//!
//! [[language]]
//! name = "swift"
//! extensions = ["swift"]
//! server = "sourcekit-lsp"
//! ```
//!
//! Every section is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stride_lsp::SyncOptions;
use stride_lsp::completion::{ChordParseError, KeyChord};

use crate::project::DEFAULT_EXTENSIONS;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The file could not be read.
	#[error("cannot read {}: {source}", path.display())]
	Io {
		/// Config file path.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// The file is not valid TOML for [`EditorConfig`].
	#[error("invalid config: {0}")]
	Parse(#[from] toml::de::Error),
	/// `completion.manual_trigger` is not a key chord.
	#[error("invalid manual trigger `{value}`: {source}")]
	InvalidTrigger {
		/// The configured value.
		value: String,
		/// Parse failure.
		#[source]
		source: ChordParseError,
	},
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
	/// Document sync tunables.
	pub sync: SyncConfig,
	/// Completion behaviour.
	pub completion: CompletionConfig,
	/// External highlighter; highlighting is off when absent.
	pub highlight: Option<HighlightConfig>,
	/// Project file index.
	pub index: IndexConfig,
	/// Known languages.
	#[serde(rename = "language")]
	pub languages: Vec<LanguageConfig>,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self {
			sync: SyncConfig::default(),
			completion: CompletionConfig::default(),
			highlight: None,
			index: IndexConfig::default(),
			languages: vec![
				LanguageConfig {
					name: "swift".into(),
					extensions: vec!["swift".into()],
					server: Some("sourcekit-lsp".into()),
					args: Vec::new(),
				},
				LanguageConfig {
					name: "rust".into(),
					extensions: vec!["rs".into()],
					server: Some("rust-analyzer".into()),
					args: Vec::new(),
				},
			],
		}
	}
}

impl EditorConfig {
	/// Reads and validates a config file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config = Self::from_toml_str(&source)?;
		tracing::debug!(path = %path.display(), languages = config.languages.len(), "config.loaded");
		Ok(config)
	}

	/// Parses and validates TOML source.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.completion.manual_trigger()?;
		Ok(config)
	}

	/// Language configured for `path`'s extension.
	pub fn language_for_path(&self, path: &Path) -> Option<&LanguageConfig> {
		LanguageConfig::for_path(&self.languages, path)
	}
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
	/// Minimum spacing between full-document syncs, in milliseconds.
	pub full_sync_interval_ms: u64,
	/// Send `didSave` when the server asks for it.
	pub send_did_save: bool,
}

impl Default for SyncConfig {
	fn default() -> Self {
		let defaults = SyncOptions::default();
		Self {
			full_sync_interval_ms: u64::try_from(defaults.full_sync_interval.as_millis()).unwrap_or(1000),
			send_did_save: defaults.send_did_save,
		}
	}
}

impl SyncConfig {
	/// Options for [`stride_lsp::DocumentSync`].
	pub fn options(&self) -> SyncOptions {
		SyncOptions {
			full_sync_interval: Duration::from_millis(self.full_sync_interval_ms),
			send_did_save: self.send_did_save,
		}
	}
}

/// `[completion]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
	/// Master switch for completion.
	pub enabled: bool,
	/// Chord that requests completion explicitly.
	pub manual_trigger: String,
	/// Delay before a typing-triggered request is sent, in milliseconds.
	pub typing_debounce_ms: u64,
	/// Select the first `${N:..}` placeholder after accepting an item.
	pub snippets: bool,
}

impl Default for CompletionConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			manual_trigger: KeyChord::default().to_string(),
			typing_debounce_ms: 0,
			snippets: true,
		}
	}
}

impl CompletionConfig {
	/// Parsed manual trigger chord.
	pub fn manual_trigger(&self) -> Result<KeyChord, ConfigError> {
		self.manual_trigger.parse().map_err(|source| ConfigError::InvalidTrigger {
			value: self.manual_trigger.clone(),
			source,
		})
	}

	/// Typing debounce as a duration.
	pub fn typing_debounce(&self) -> Duration {
		Duration::from_millis(self.typing_debounce_ms)
	}
}

/// `[highlight]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HighlightConfig {
	/// Helper executable.
	pub command: PathBuf,
	/// Arguments placed before the file path.
	#[serde(default)]
	pub args: Vec<String>,
}

/// `[index]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
	/// File extensions (without dot) included in the project index.
	pub extensions: Vec<String>,
}

impl Default for IndexConfig {
	fn default() -> Self {
		Self {
			extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
		}
	}
}

/// One `[[language]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
	/// Language id sent with `didOpen`.
	pub name: String,
	/// File extensions (without dot).
	#[serde(default)]
	pub extensions: Vec<String>,
	/// Language server executable.
	#[serde(default)]
	pub server: Option<String>,
	/// Language server arguments.
	#[serde(default)]
	pub args: Vec<String>,
}

impl LanguageConfig {
	/// First entry in `languages` claiming `path`'s extension, compared case-insensitively.
	pub fn for_path<'a>(languages: &'a [LanguageConfig], path: &Path) -> Option<&'a LanguageConfig> {
		let ext = path.extension()?.to_str()?;
		languages.iter().find(|lang| lang.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;
	use stride_lsp::completion::Modifiers;

	use super::*;

	#[test]
	fn empty_source_is_default() {
		assert_eq!(EditorConfig::from_toml_str("").unwrap(), EditorConfig::default());
	}

	#[test]
	fn defaults() {
		let config = EditorConfig::default();
		assert_eq!(config.sync.full_sync_interval_ms, 1000);
		assert_eq!(config.completion.manual_trigger().unwrap(), KeyChord::new(Modifiers::CTRL, ' '));
		assert!(config.index.extensions.iter().any(|e| e == "swift"));
		assert_eq!(config.completion.typing_debounce(), Duration::ZERO);
	}

	#[test]
	fn parses_all_sections() {
		let config = EditorConfig::from_toml_str(
			r#"
			[sync]
			full_sync_interval_ms = 250
			send_did_save = false

			[completion]
			manual_trigger = "alt+/"
			typing_debounce_ms = 80
			snippets = false

			[highlight]
			command = "/usr/local/bin/hl"
			args = ["--json"]

			[index]
			extensions = ["rs", "toml"]

			[[language]]
			name = "python"
			extensions = ["py", "pyi"]
			server = "pylsp"
			"#,
		)
		.unwrap();

		assert_eq!(
			config.sync.options(),
			SyncOptions {
				full_sync_interval: Duration::from_millis(250),
				send_did_save: false,
			}
		);
		assert_eq!(config.completion.manual_trigger().unwrap(), KeyChord::new(Modifiers::ALT, '/'));
		assert_eq!(config.completion.typing_debounce(), Duration::from_millis(80));
		assert!(!config.completion.snippets);
		assert_eq!(
			config.highlight,
			Some(HighlightConfig {
				command: "/usr/local/bin/hl".into(),
				args: vec!["--json".into()],
			})
		);
		assert_eq!(config.index.extensions, vec!["rs", "toml"]);
		assert_eq!(config.languages.len(), 1);
		assert_eq!(config.language_for_path(Path::new("a/b.PYI")).unwrap().name, "python");
		assert!(config.language_for_path(Path::new("main.swift")).is_none());
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = EditorConfig::from_toml_str("[sync]\nfull_sync_interval = 3\n").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)), "{err}");
	}

	#[test]
	fn rejects_bad_trigger() {
		let err = EditorConfig::from_toml_str("[completion]\nmanual_trigger = \"hyper+x\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidTrigger { .. }), "{err}");
	}

	#[test]
	fn load_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[completion]\ntyping_debounce_ms = 15").unwrap();
		let config = EditorConfig::load(file.path()).unwrap();
		assert_eq!(config.completion.typing_debounce_ms, 15);
	}

	#[test]
	fn load_reports_missing_file() {
		let err = EditorConfig::load(Path::new("/nonexistent/stride.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn language_lookup_without_extension() {
		let config = EditorConfig::default();
		assert!(config.language_for_path(Path::new("Makefile")).is_none());
		assert_eq!(config.language_for_path(Path::new("src/main.rs")).unwrap().name, "rust");
	}
}
