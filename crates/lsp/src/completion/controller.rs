use std::time::Duration;

use lsp_types::{CompletionContext, CompletionItem, CompletionResponse, CompletionTriggerKind, Position, Uri};
use stride_worker::{GenerationClock, GenerationToken, TaskClass, WorkerRuntime};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::ClientHandle;

/// The kind of trigger for a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionTrigger {
	/// Triggered by typing the contained trigger string.
	Typing(String),
	/// Triggered manually (e.g. by shortcut).
	Manual,
}

impl CompletionTrigger {
	/// Returns the debounce duration for this trigger kind.
	pub fn debounce(&self, typing: Duration) -> Duration {
		match self {
			CompletionTrigger::Typing(_) => typing,
			CompletionTrigger::Manual => Duration::ZERO,
		}
	}

	/// The LSP completion context describing this trigger.
	pub fn context(&self) -> CompletionContext {
		match self {
			CompletionTrigger::Typing(character) => CompletionContext {
				trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
				trigger_character: Some(character.clone()),
			},
			CompletionTrigger::Manual => CompletionContext {
				trigger_kind: CompletionTriggerKind::INVOKED,
				trigger_character: None,
			},
		}
	}
}

/// A request for code completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
	/// Request id from [`CompletionController::next_id`].
	pub id: u64,
	/// The LSP client handle.
	pub client: ClientHandle,
	/// The document URI.
	pub uri: Uri,
	/// The origin, in wire coordinates.
	pub position: Position,
	/// What started the request.
	pub trigger: CompletionTrigger,
}

/// Response delivered to the controller's callback.
#[derive(Debug)]
pub struct CompletionResponseEvent {
	/// Id of the request this answers.
	pub id: u64,
	/// Items, or the transport error.
	pub result: crate::Result<Vec<CompletionItem>>,
}

/// Flattens either response shape into its items.
pub fn response_items(response: Option<CompletionResponse>) -> Vec<CompletionItem> {
	match response {
		Some(CompletionResponse::Array(items)) => items,
		Some(CompletionResponse::List(list)) => list.items,
		None => Vec::new(),
	}
}

/// Controller for managing completion requests, including debouncing and cancellation.
///
/// Ids come from a [`GenerationClock`] and strictly increase. Starting a request
/// cancels the previous task so it stops waiting, but a superseded response that
/// still gets through is expected to be rejected by id downstream.
#[derive(Debug)]
pub struct CompletionController {
	clock: GenerationClock,
	in_flight: Option<GenerationToken>,
	worker_runtime: WorkerRuntime,
	typing_debounce: Duration,
}

impl Default for CompletionController {
	fn default() -> Self {
		Self::new(WorkerRuntime::new(), Duration::ZERO)
	}
}

impl CompletionController {
	/// Creates a new completion controller.
	pub fn new(worker_runtime: WorkerRuntime, typing_debounce: Duration) -> Self {
		Self {
			clock: GenerationClock::new(),
			in_flight: None,
			worker_runtime,
			typing_debounce,
		}
	}

	/// Allocates the id for the next request.
	pub fn next_id(&self) -> u64 {
		self.clock.next()
	}

	/// The most recently allocated id.
	pub fn current_id(&self) -> u64 {
		self.clock.current()
	}

	/// Id of the request whose task is still running, if any.
	pub fn in_flight(&self) -> Option<u64> {
		self.in_flight.as_ref().filter(|t| !t.is_cancelled()).map(GenerationToken::generation)
	}

	/// Cancels any in-flight completion request.
	pub fn cancel(&mut self) {
		if let Some(in_flight) = self.in_flight.take() {
			in_flight.cancel();
		}
	}

	/// Starts `request`, cancelling any in-flight one.
	///
	/// `callback` runs on a worker task with the response, unless the request is
	/// cancelled first.
	pub fn trigger<F>(&mut self, request: CompletionRequest, callback: F)
	where
		F: FnOnce(CompletionResponseEvent) + Send + 'static,
	{
		self.cancel();
		let token = GenerationToken::new(request.id, CancellationToken::new());
		self.in_flight = Some(token.clone());
		let debounce = request.trigger.debounce(self.typing_debounce);
		tracing::debug!(id = request.id, trigger = ?request.trigger, ?debounce, "lsp.completion.request");

		self.worker_runtime.spawn(TaskClass::Interactive, async move {
			if debounce > Duration::ZERO {
				tokio::select! {
					_ = token.cancelled() => return,
					_ = sleep(debounce) => {}
				}
			} else if token.is_cancelled() {
				return;
			}

			let id = request.id;
			let context = request.trigger.context();
			let result = tokio::select! {
				_ = token.cancelled() => {
					tracing::trace!(id, "lsp.completion.cancelled");
					return;
				}
				response = request.client.completion(request.uri, request.position, Some(context)) => response.map(response_items),
			};

			if token.is_cancelled() {
				return;
			}
			callback(CompletionResponseEvent { id, result });
		});
	}
}
