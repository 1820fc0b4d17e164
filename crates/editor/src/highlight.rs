//! Syntax highlighting through an external helper process.
//!
//! The helper is run with the file path as its last argument, reads the buffer
//! contents on stdin and prints a JSON array of [`Token`]s on stdout. Each pass
//! works on a snapshot of the buffer and is tagged with a generation so the
//! coordinator can drop results that a newer pass has superseded.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stride_primitives::Rope;
use stride_worker::{GenerationClock, GenerationToken, TaskClass, WorkerRuntime};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::HighlightConfig;

/// One highlighted span as the helper reports it, in UTF-8 byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Highlight class, e.g. `keyword` or `string`.
	pub kind: String,
	/// Start byte offset.
	pub start: usize,
	/// End byte offset (exclusive).
	pub end: usize,
}

impl Token {
	/// The span as char offsets into `text`; `None` when it does not fit.
	pub fn char_range(&self, text: &Rope) -> Option<Range<usize>> {
		if self.start > self.end {
			return None;
		}
		let start = text.try_byte_to_char(self.start).ok()?;
		let end = text.try_byte_to_char(self.end).ok()?;
		Some(start..end)
	}
}

/// Errors from a highlight pass.
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
	/// The helper could not be started.
	#[error("cannot spawn {}: {source}", command.display())]
	Spawn {
		/// Helper executable.
		command: PathBuf,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// Reading the helper's output failed.
	#[error("{0}")]
	Io(#[from] std::io::Error),
	/// The helper exited unsuccessfully.
	#[error("highlighter exited with {status}: {stderr}")]
	Failed {
		/// Exit status.
		status: ExitStatus,
		/// Captured stderr.
		stderr: String,
	},
	/// The helper's output is not a token array.
	#[error("invalid highlighter output: {0}")]
	Decode(#[from] serde_json::Error),
}

/// A token resolved against the text it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
	/// Highlight class.
	pub kind: String,
	/// Char offsets into the highlighted text.
	pub range: Range<usize>,
}

/// Produces highlight tokens for a document.
#[async_trait]
pub trait Highlighter: Send + Sync + 'static {
	/// Highlights `source`, the current contents of the document at `path`.
	///
	/// Token offsets are UTF-8 byte offsets into `source`.
	async fn run(&self, path: &Path, source: &str) -> Result<Vec<Token>, HighlightError>;
}

/// [`Highlighter`] that shells out to a configured helper.
#[derive(Debug, Clone)]
pub struct ProcessHighlighter {
	command: PathBuf,
	args: Vec<String>,
}

impl ProcessHighlighter {
	/// Creates a highlighter running `command args.. <path>` with the source on stdin.
	pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
		Self { command: command.into(), args }
	}

	/// Creates a highlighter from its config section.
	pub fn from_config(config: &HighlightConfig) -> Self {
		Self::new(config.command.clone(), config.args.clone())
	}
}

#[async_trait]
impl Highlighter for ProcessHighlighter {
	async fn run(&self, path: &Path, source: &str) -> Result<Vec<Token>, HighlightError> {
		let mut child = Command::new(&self.command)
			.args(&self.args)
			.arg(path)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|source| HighlightError::Spawn {
				command: self.command.clone(),
				source,
			})?;

		// Stdin is fed while stdout drains; the helper may exit without reading it.
		let stdin = child.stdin.take();
		let feed = async move {
			let Some(mut stdin) = stdin else {
				return Ok(());
			};
			match stdin.write_all(source.as_bytes()).await {
				Err(error) if error.kind() != std::io::ErrorKind::BrokenPipe => Err(error),
				_ => Ok(()),
			}
		};
		let (fed, output) = tokio::join!(feed, child.wait_with_output());
		let output = output?;
		fed?;

		if !output.status.success() {
			return Err(HighlightError::Failed {
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
			});
		}
		decode_tokens(&output.stdout)
	}
}

/// Parses a JSON token array.
pub fn decode_tokens(bytes: &[u8]) -> Result<Vec<Token>, HighlightError> {
	Ok(serde_json::from_slice(bytes)?)
}

/// Outcome of one highlight pass.
#[derive(Debug)]
pub struct HighlightResult {
	/// Generation the pass was scheduled with.
	pub generation: u64,
	/// Spans in the snapshot the pass ran on, or why the pass failed.
	pub result: Result<Vec<HighlightSpan>, HighlightError>,
}

/// Resolves `tokens` against `text`, dropping those that do not fit it.
pub fn resolve_tokens(tokens: Vec<Token>, text: &Rope) -> Vec<HighlightSpan> {
	let total = tokens.len();
	let spans: Vec<_> = tokens
		.into_iter()
		.filter_map(|token| {
			let range = token.char_range(text)?;
			Some(HighlightSpan { kind: token.kind, range })
		})
		.collect();
	if spans.len() < total {
		tracing::trace!(dropped = total - spans.len(), "highlight.tokens_out_of_range");
	}
	spans
}

/// Runs highlight passes one at a time, newest wins.
///
/// Scheduling a pass cancels the running one (dropping its child process).
/// A pass that finishes anyway is still tagged with its generation, which
/// [`is_current`](Self::is_current) rejects.
#[derive(Debug)]
pub struct HighlightScheduler {
	clock: GenerationClock,
	running: Option<GenerationToken>,
	runtime: WorkerRuntime,
}

impl HighlightScheduler {
	/// Creates a scheduler spawning passes on `runtime`.
	pub fn new(runtime: WorkerRuntime) -> Self {
		Self {
			clock: GenerationClock::new(),
			running: None,
			runtime,
		}
	}

	/// Starts a pass over `text`, a snapshot of the document at `path`, and
	/// returns its generation.
	///
	/// `deliver` runs on a worker task unless the pass is cancelled first.
	pub fn schedule<F>(&mut self, highlighter: Arc<dyn Highlighter>, path: PathBuf, text: Rope, deliver: F) -> u64
	where
		F: FnOnce(HighlightResult) + Send + 'static,
	{
		self.cancel();
		let token = GenerationToken::mint(&self.clock);
		let generation = token.generation();
		self.running = Some(token.clone());
		tracing::trace!(generation, path = %path.display(), "highlight.schedule");

		self.runtime.spawn(TaskClass::Background, async move {
			let result = tokio::select! {
				biased;
				_ = token.cancelled() => {
					tracing::trace!(generation, "highlight.cancelled");
					return;
				}
				result = run_pass(highlighter.as_ref(), &path, &text) => result,
			};
			if let Err(error) = &result {
				tracing::debug!(generation, %error, "highlight.failed");
			}
			deliver(HighlightResult { generation, result });
		});
		generation
	}

	/// Whether `generation` belongs to the most recent pass.
	pub fn is_current(&self, generation: u64) -> bool {
		generation != 0 && generation == self.clock.current()
	}

	/// Cancels the running pass, if any.
	pub fn cancel(&mut self) {
		if let Some(token) = self.running.take() {
			token.cancel();
		}
	}
}

async fn run_pass(highlighter: &dyn Highlighter, path: &Path, text: &Rope) -> Result<Vec<HighlightSpan>, HighlightError> {
	let source = text.to_string();
	let tokens = highlighter.run(path, &source).await?;
	Ok(resolve_tokens(tokens, text))
}
