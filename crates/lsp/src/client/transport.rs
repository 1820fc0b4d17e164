use async_trait::async_trait;
use lsp_types::notification::{DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument, Notification as _};
use lsp_types::{
	CompletionParams, CompletionResponse, DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
	GotoDefinitionParams, GotoDefinitionResponse, Uri,
};

use crate::Result;

/// A text document notification sent from client to server.
#[derive(Debug, Clone)]
pub enum Notification {
	/// `textDocument/didOpen`.
	DidOpen(DidOpenTextDocumentParams),
	/// `textDocument/didChange`.
	DidChange(DidChangeTextDocumentParams),
	/// `textDocument/didSave`.
	DidSave(DidSaveTextDocumentParams),
	/// `textDocument/didClose`.
	DidClose(DidCloseTextDocumentParams),
}

impl Notification {
	/// The JSON-RPC method name.
	pub fn method(&self) -> &'static str {
		match self {
			Self::DidOpen(_) => DidOpenTextDocument::METHOD,
			Self::DidChange(_) => DidChangeTextDocument::METHOD,
			Self::DidSave(_) => DidSaveTextDocument::METHOD,
			Self::DidClose(_) => DidCloseTextDocument::METHOD,
		}
	}

	/// The document this notification is about.
	pub fn uri(&self) -> &Uri {
		match self {
			Self::DidOpen(p) => &p.text_document.uri,
			Self::DidChange(p) => &p.text_document.uri,
			Self::DidSave(p) => &p.text_document.uri,
			Self::DidClose(p) => &p.text_document.uri,
		}
	}

	/// Document version carried by the notification, if any.
	pub fn version(&self) -> Option<i32> {
		match self {
			Self::DidOpen(p) => Some(p.text_document.version),
			Self::DidChange(p) => Some(p.text_document.version),
			Self::DidSave(_) | Self::DidClose(_) => None,
		}
	}

	/// Serializes the params to JSON.
	pub fn params(&self) -> Result<serde_json::Value> {
		let value = match self {
			Self::DidOpen(p) => serde_json::to_value(p)?,
			Self::DidChange(p) => serde_json::to_value(p)?,
			Self::DidSave(p) => serde_json::to_value(p)?,
			Self::DidClose(p) => serde_json::to_value(p)?,
		};
		Ok(value)
	}
}

/// Opaque channel to a running language server.
///
/// Implementations own process management and JSON-RPC framing. `notify` must not
/// reorder: the client handle awaits each call before issuing the next one.
#[async_trait]
pub trait LspTransport: Send + Sync + 'static {
	/// Sends a notification.
	async fn notify(&self, notification: Notification) -> Result<()>;

	/// Sends `textDocument/completion` and waits for the response.
	async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>>;

	/// Sends `textDocument/definition` and waits for the response.
	async fn definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>>;
}
