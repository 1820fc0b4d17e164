//! Server capabilities reduced to what document sync and completion need.

use lsp_types::{OneOf, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncSaveOptions};

use crate::client::OffsetEncoding;

/// How document changes are reported to the server.
///
/// Fixed for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
	/// The server does not want change notifications.
	#[default]
	None,
	/// Every change resends the whole document.
	Full,
	/// Changes are sent as ranged edits.
	Incremental,
}

impl SyncMode {
	/// Derives the mode from advertised capabilities. A missing capability means [`SyncMode::None`].
	pub fn from_capabilities(caps: &ServerCapabilities) -> Self {
		match &caps.text_document_sync {
			Some(TextDocumentSyncCapability::Kind(kind)) => Self::from(*kind),
			Some(TextDocumentSyncCapability::Options(options)) => options.change.map(Self::from).unwrap_or_default(),
			None => Self::None,
		}
	}
}

impl From<TextDocumentSyncKind> for SyncMode {
	fn from(kind: TextDocumentSyncKind) -> Self {
		if kind == TextDocumentSyncKind::FULL {
			Self::Full
		} else if kind == TextDocumentSyncKind::INCREMENTAL {
			Self::Incremental
		} else {
			Self::None
		}
	}
}

/// Whether and how `textDocument/didSave` is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveNotification {
	/// The server did not ask for save notifications.
	#[default]
	Disabled,
	/// Send `didSave`, with the full text when `include_text` is set.
	Enabled {
		/// Whether the notification carries the document text.
		include_text: bool,
	},
}

impl SaveNotification {
	fn from_capabilities(caps: &ServerCapabilities) -> Self {
		let Some(TextDocumentSyncCapability::Options(options)) = &caps.text_document_sync else {
			return Self::Disabled;
		};
		match &options.save {
			Some(TextDocumentSyncSaveOptions::Supported(true)) => Self::Enabled { include_text: false },
			Some(TextDocumentSyncSaveOptions::SaveOptions(save)) => Self::Enabled {
				include_text: save.include_text.unwrap_or(false),
			},
			Some(TextDocumentSyncSaveOptions::Supported(false)) | None => Self::Disabled,
		}
	}
}

/// The parts of [`ServerCapabilities`] this crate acts on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegotiatedCapabilities {
	/// Change notification strategy.
	pub sync_mode: SyncMode,
	/// Position encoding for every wire position.
	pub encoding: OffsetEncoding,
	/// Whether the server answers `textDocument/completion`.
	pub completion: bool,
	/// Whether the server answers `textDocument/definition`.
	pub definition: bool,
	/// Strings that automatically trigger completion.
	pub trigger_characters: Vec<String>,
	/// Save notification policy.
	pub save: SaveNotification,
}

impl NegotiatedCapabilities {
	/// Reduces advertised capabilities.
	///
	/// Unknown position encodings fall back to UTF-16, the protocol default.
	pub fn from_server(caps: &ServerCapabilities) -> Self {
		let encoding = caps.position_encoding.as_ref().and_then(OffsetEncoding::from_lsp).unwrap_or_default();
		let trigger_characters = caps
			.completion_provider
			.as_ref()
			.and_then(|c| c.trigger_characters.clone())
			.unwrap_or_default()
			.into_iter()
			.filter(|t| !t.is_empty())
			.collect();
		Self {
			sync_mode: SyncMode::from_capabilities(caps),
			encoding,
			completion: caps.completion_provider.is_some(),
			definition: matches!(caps.definition_provider, Some(OneOf::Left(true) | OneOf::Right(_))),
			trigger_characters,
			save: SaveNotification::from_capabilities(caps),
		}
	}
}
