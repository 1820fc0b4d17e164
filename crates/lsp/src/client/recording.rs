//! In-memory transport that records outbound traffic.
//!
//! Used for dry runs (the `stride-trace` binary prints what it records) and by
//! tests that need to observe or hold back server traffic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lsp_types::request::{Completion, GotoDefinition, Request as _};
use lsp_types::{CompletionItem, CompletionParams, CompletionResponse, GotoDefinitionParams, GotoDefinitionResponse};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

use super::{LspTransport, Notification};
use crate::{Error, Result};

/// JSON-RPC internal error code used for scripted failures.
const INTERNAL_ERROR: i64 = -32603;

/// One message observed by a [`RecordingTransport`].
#[derive(Debug, Clone)]
pub enum Recorded {
	/// A notification.
	Notification(Notification),
	/// A `textDocument/completion` request.
	Completion(CompletionParams),
	/// A `textDocument/definition` request.
	Definition(GotoDefinitionParams),
}

impl Recorded {
	/// The JSON-RPC method name.
	pub fn method(&self) -> &'static str {
		match self {
			Self::Notification(n) => n.method(),
			Self::Completion(_) => Completion::METHOD,
			Self::Definition(_) => GotoDefinition::METHOD,
		}
	}

	/// Renders the message as `{"method": .., "params": ..}`.
	pub fn to_json(&self) -> Result<serde_json::Value> {
		let params = match self {
			Self::Notification(n) => n.params()?,
			Self::Completion(p) => serde_json::to_value(p)?,
			Self::Definition(p) => serde_json::to_value(p)?,
		};
		Ok(serde_json::json!({ "method": self.method(), "params": params }))
	}
}

/// Canned answer to a completion request.
#[derive(Debug, Clone)]
pub enum ScriptedCompletion {
	/// Respond with these items.
	Items(Vec<CompletionItem>),
	/// Respond with an internal error carrying this message.
	Fail(String),
}

impl ScriptedCompletion {
	fn into_result(self) -> Result<Option<CompletionResponse>> {
		match self {
			Self::Items(items) => Ok(Some(CompletionResponse::Array(items))),
			Self::Fail(message) => Err(Error::Response {
				code: INTERNAL_ERROR,
				message,
			}),
		}
	}
}

/// Transport that records everything and answers completions from a script.
///
/// Completion answers come from the queue filled by [`push_completion`](Self::push_completion),
/// falling back to [`set_default_items`](Self::set_default_items). With
/// [`hold_completions`](Self::hold_completions) enabled, requests stay pending
/// until [`release`](Self::release) answers them, in any order. Definition
/// requests are answered from [`push_definition`](Self::push_definition), or with
/// no result.
#[derive(Debug, Default)]
pub struct RecordingTransport {
	log: Mutex<Vec<Recorded>>,
	scripted: Mutex<VecDeque<ScriptedCompletion>>,
	default_items: Mutex<Vec<CompletionItem>>,
	definitions: Mutex<VecDeque<GotoDefinitionResponse>>,
	held: Mutex<Vec<Option<oneshot::Sender<ScriptedCompletion>>>>,
	hold: AtomicBool,
	fail_notifications: AtomicBool,
	yield_on_notify: AtomicBool,
	arrived: Notify,
}

impl RecordingTransport {
	/// Creates an empty transport.
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues the answer for the next completion request.
	pub fn push_completion(&self, answer: ScriptedCompletion) {
		self.scripted.lock().push_back(answer);
	}

	/// Items returned when no scripted answer is queued.
	pub fn set_default_items(&self, items: Vec<CompletionItem>) {
		*self.default_items.lock() = items;
	}

	/// Keeps completion requests pending until released.
	pub fn hold_completions(&self, hold: bool) {
		self.hold.store(hold, Ordering::SeqCst);
	}

	/// Queues the answer for the next definition request.
	pub fn push_definition(&self, answer: GotoDefinitionResponse) {
		self.definitions.lock().push_back(answer);
	}

	/// Makes each notification yield to the scheduler before it is recorded, the
	/// way a transport writing to a pipe would.
	pub fn yield_on_notify(&self, yield_first: bool) {
		self.yield_on_notify.store(yield_first, Ordering::SeqCst);
	}

	/// Makes every notification fail after it is recorded.
	pub fn fail_notifications(&self, fail: bool) {
		self.fail_notifications.store(fail, Ordering::SeqCst);
	}

	/// Answers the `index`-th held request (in arrival order).
	///
	/// Returns false if there is no such request, it was already released, or its
	/// caller stopped waiting.
	pub fn release(&self, index: usize, answer: ScriptedCompletion) -> bool {
		let sender = self.held.lock().get_mut(index).and_then(Option::take);
		sender.is_some_and(|tx| tx.send(answer).is_ok())
	}

	/// Everything recorded so far.
	pub fn messages(&self) -> Vec<Recorded> {
		self.log.lock().clone()
	}

	/// Drains the record.
	pub fn take(&self) -> Vec<Recorded> {
		std::mem::take(&mut *self.log.lock())
	}

	/// Recorded notifications, in send order.
	pub fn notifications(&self) -> Vec<Notification> {
		self.log
			.lock()
			.iter()
			.filter_map(|m| match m {
				Recorded::Notification(n) => Some(n.clone()),
				_ => None,
			})
			.collect()
	}

	/// Recorded completion requests, in arrival order.
	pub fn completion_requests(&self) -> Vec<CompletionParams> {
		self.log
			.lock()
			.iter()
			.filter_map(|m| match m {
				Recorded::Completion(p) => Some(p.clone()),
				_ => None,
			})
			.collect()
	}

	/// Recorded definition requests, in arrival order.
	pub fn definition_requests(&self) -> Vec<GotoDefinitionParams> {
		self.log
			.lock()
			.iter()
			.filter_map(|m| match m {
				Recorded::Definition(p) => Some(p.clone()),
				_ => None,
			})
			.collect()
	}

	/// Waits until at least `count` completion requests have arrived.
	pub async fn wait_for_completions(&self, count: usize) {
		loop {
			let arrived = self.arrived.notified();
			if self.completion_requests().len() >= count {
				return;
			}
			arrived.await;
		}
	}
}

#[async_trait]
impl LspTransport for RecordingTransport {
	async fn notify(&self, notification: Notification) -> Result<()> {
		let method = notification.method();
		if self.yield_on_notify.load(Ordering::SeqCst) {
			tokio::task::yield_now().await;
		}
		self.log.lock().push(Recorded::Notification(notification));
		if self.fail_notifications.load(Ordering::SeqCst) {
			return Err(Error::Protocol(format!("{method} rejected")));
		}
		Ok(())
	}

	async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
		self.log.lock().push(Recorded::Completion(params));

		if self.hold.load(Ordering::SeqCst) {
			let (tx, rx) = oneshot::channel();
			self.held.lock().push(Some(tx));
			self.arrived.notify_waiters();
			return rx.await.map_err(|_| Error::ServiceStopped)?.into_result();
		}

		self.arrived.notify_waiters();
		let answer = self.scripted.lock().pop_front();
		match answer {
			Some(answer) => answer.into_result(),
			None => Ok(Some(CompletionResponse::Array(self.default_items.lock().clone()))),
		}
	}

	async fn definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
		self.log.lock().push(Recorded::Definition(params));
		Ok(self.definitions.lock().pop_front())
	}
}
