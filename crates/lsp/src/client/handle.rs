use std::fmt;
use std::sync::Arc;

use lsp_types::{
	CompletionContext, CompletionParams, CompletionResponse, GotoDefinitionParams, GotoDefinitionResponse, Location, PartialResultParams, Position,
	ServerCapabilities, TextDocumentIdentifier, TextDocumentPositionParams, Uri, WorkDoneProgressParams,
};
use stride_worker::{TaskClass, WorkerRuntime};
use tokio::sync::{mpsc, oneshot};

use super::{LspTransport, Notification, OffsetEncoding};
use crate::capabilities::NegotiatedCapabilities;
use crate::{Error, Result};

enum Outbound {
	Notify(Notification),
	Barrier(oneshot::Sender<()>),
}

struct Inner {
	transport: Arc<dyn LspTransport>,
	capabilities: ServerCapabilities,
	negotiated: NegotiatedCapabilities,
	outbound: mpsc::UnboundedSender<Outbound>,
}

/// Handle to an initialized language server connection.
///
/// Clones share the same outbound queue. The pump task exits once every clone
/// is dropped.
#[derive(Clone)]
pub struct ClientHandle {
	inner: Arc<Inner>,
}

impl fmt::Debug for ClientHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientHandle").field("negotiated", &self.inner.negotiated).finish_non_exhaustive()
	}
}

impl ClientHandle {
	/// Wraps `transport` for a server that advertised `capabilities`, and starts
	/// the outbound pump on `runtime`.
	pub fn new(transport: Arc<dyn LspTransport>, capabilities: ServerCapabilities, runtime: &WorkerRuntime) -> Self {
		let negotiated = NegotiatedCapabilities::from_server(&capabilities);
		let (tx, rx) = mpsc::unbounded_channel();
		runtime.spawn(TaskClass::Interactive, pump(transport.clone(), rx));
		tracing::debug!(
			sync = ?negotiated.sync_mode,
			encoding = ?negotiated.encoding,
			triggers = negotiated.trigger_characters.len(),
			"lsp.client.ready"
		);
		Self {
			inner: Arc::new(Inner {
				transport,
				capabilities,
				negotiated,
				outbound: tx,
			}),
		}
	}

	/// Raw capabilities the server advertised.
	pub fn capabilities(&self) -> &ServerCapabilities {
		&self.inner.capabilities
	}

	/// Capabilities reduced to what the sync and completion layers consume.
	pub fn negotiated(&self) -> &NegotiatedCapabilities {
		&self.inner.negotiated
	}

	/// Position encoding in use on this connection.
	pub fn offset_encoding(&self) -> OffsetEncoding {
		self.inner.negotiated.encoding
	}

	/// Enqueues a notification. Never blocks.
	///
	/// Delivery failures are logged by the pump and not reported here.
	pub fn notify(&self, notification: Notification) -> Result<()> {
		self.inner.outbound.send(Outbound::Notify(notification)).map_err(|_| Error::ServiceStopped)
	}

	/// Waits until every notification enqueued before this call was handed to the transport.
	pub async fn flush(&self) -> Result<()> {
		let (tx, rx) = oneshot::channel();
		self.inner.outbound.send(Outbound::Barrier(tx)).map_err(|_| Error::ServiceStopped)?;
		rx.await.map_err(|_| Error::ServiceStopped)
	}

	/// Requests completions at `position`.
	///
	/// Notifications enqueued before this call reach the transport before the
	/// request does. Returns `Ok(None)` without contacting the server if it does
	/// not provide completion.
	pub async fn completion(&self, uri: Uri, position: Position, context: Option<CompletionContext>) -> Result<Option<CompletionResponse>> {
		if !self.inner.negotiated.completion {
			return Ok(None);
		}
		let params = CompletionParams {
			text_document_position: text_position(uri, position),
			work_done_progress_params: WorkDoneProgressParams::default(),
			partial_result_params: PartialResultParams::default(),
			context,
		};
		self.flush().await?;
		self.inner.transport.completion(params).await
	}

	/// Asks where the symbol at `position` is defined and returns the first location.
	///
	/// Ordered after pending notifications like [`completion`](Self::completion).
	/// Returns `Ok(None)` if the server has no definition support or no answer.
	pub async fn definition(&self, uri: Uri, position: Position) -> Result<Option<Location>> {
		if !self.inner.negotiated.definition {
			return Ok(None);
		}
		let params = GotoDefinitionParams {
			text_document_position_params: text_position(uri, position),
			work_done_progress_params: WorkDoneProgressParams::default(),
			partial_result_params: PartialResultParams::default(),
		};
		self.flush().await?;
		Ok(self.inner.transport.definition(params).await?.and_then(first_location))
	}
}

fn text_position(uri: Uri, position: Position) -> TextDocumentPositionParams {
	TextDocumentPositionParams {
		text_document: TextDocumentIdentifier { uri },
		position,
	}
}

/// Links resolve to their target selection, which is the name rather than the whole item.
fn first_location(response: GotoDefinitionResponse) -> Option<Location> {
	match response {
		GotoDefinitionResponse::Scalar(location) => Some(location),
		GotoDefinitionResponse::Array(locations) => locations.into_iter().next(),
		GotoDefinitionResponse::Link(links) => links.into_iter().next().map(|link| Location {
			uri: link.target_uri,
			range: link.target_selection_range,
		}),
	}
}

async fn pump(transport: Arc<dyn LspTransport>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
	while let Some(item) = rx.recv().await {
		match item {
			Outbound::Notify(notification) => {
				let method = notification.method();
				let version = notification.version();
				if let Err(error) = transport.notify(notification).await {
					tracing::warn!(method, ?version, %error, "lsp.notify.failed");
				}
			}
			Outbound::Barrier(ack) => {
				let _ = ack.send(());
			}
		}
	}
	tracing::trace!("lsp.client.pump_stopped");
}
