//! Dry-run driver for the document sync and completion layers.
//!
//! Opens a file against an in-memory language server, replays an edit script
//! through the [`Coordinator`] and prints every outbound message as one JSON
//! line on stdout. Logs go to stderr (`RUST_LOG` controls the level).

mod cli;
mod script;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use stride_editor::config::LanguageConfig;
use stride_editor::{Coordinator, EditorConfig, PopoverEvent, ProjectRegistry};
use stride_lsp::completion::CompletionState;
use stride_lsp::lsp_types::{CompletionItem, CompletionOptions, SaveOptions, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncOptions, TextDocumentSyncSaveOptions};
use stride_lsp::{ClientHandle, RecordingTransport};
use stride_primitives::{Buffer, TextBuffer};
use stride_worker::WorkerRuntime;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::script::{Command, parse_script};

/// Upper bound on waiting for a scripted completion answer.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let mut config = match &cli.config {
		Some(path) => EditorConfig::load(path)?,
		None => EditorConfig::default(),
	};
	if let Some(language) = &cli.language {
		let extension = cli.file.extension().and_then(|e| e.to_str()).unwrap_or_default().to_string();
		config.languages.insert(
			0,
			LanguageConfig {
				name: language.clone(),
				extensions: vec![extension],
				server: None,
				args: Vec::new(),
			},
		);
	}

	let source = std::fs::read_to_string(&cli.script).with_context(|| format!("reading script {}", cli.script.display()))?;
	let commands = parse_script(&source)?;

	let runtime = WorkerRuntime::new();
	let transport = Arc::new(RecordingTransport::new());
	if let Some(path) = &cli.items {
		let json = std::fs::read_to_string(path).with_context(|| format!("reading items {}", path.display()))?;
		let items: Vec<CompletionItem> = serde_json::from_str(&json).with_context(|| format!("parsing items {}", path.display()))?;
		transport.set_default_items(items);
	}
	let client = ClientHandle::new(transport.clone(), capabilities(&cli), &runtime);
	let projects = Arc::new(ProjectRegistry::new(config.index.extensions.clone()));
	let manual = config.completion.manual_trigger()?;
	let mut coordinator = Coordinator::new(config, runtime, projects)?.with_client(client.clone());

	let mut buffer = Buffer::default();
	coordinator.open_file(&cli.file, &mut buffer)?;
	emit(&client, &transport).await?;

	for command in commands {
		tracing::debug!(?command, "trace.command");
		match command {
			Command::Insert { at, text } => buffer.insert(at, &text, &mut coordinator)?,
			Command::Delete { at, count } => buffer.delete(at, count, &mut coordinator)?,
			Command::Cursor(at) => {
				buffer.set_cursor(at)?;
				coordinator.cursor_moved(&buffer);
			}
			Command::Type(text) => buffer.type_text(&text, &mut coordinator)?,
			Command::Backspace => buffer.backspace(&mut coordinator)?,
			Command::Complete => {
				if !coordinator.trigger_completion(&buffer, &manual) {
					tracing::warn!("trace.complete.unavailable");
				}
			}
			Command::Select(index) => {
				if !coordinator.select_completion(&mut buffer, index)? {
					bail!("no completion item {index} to select");
				}
			}
			Command::Escape => {
				coordinator.dismiss_completion();
			}
			Command::Save => coordinator.save(&buffer)?,
			Command::Wait(duration) => tokio::time::sleep(duration).await,
		}
		await_completion(&mut coordinator).await?;
		report(coordinator.pump_events());
		emit(&client, &transport).await?;
	}

	coordinator.close();
	emit(&client, &transport).await?;
	tracing::info!(chars = buffer.text().len_chars(), "trace.done");
	Ok(())
}

fn capabilities(cli: &Cli) -> ServerCapabilities {
	ServerCapabilities {
		text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
			open_close: Some(true),
			change: Some(cli.sync.into()),
			save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions { include_text: Some(false) })),
			..Default::default()
		})),
		completion_provider: Some(CompletionOptions {
			trigger_characters: Some(cli.triggers.clone()),
			..Default::default()
		}),
		..Default::default()
	}
}

/// Waits for the response to a pending completion request, if there is one.
async fn await_completion(coordinator: &mut Coordinator) -> anyhow::Result<()> {
	while coordinator.completion_session().is_some_and(|s| s.state() == CompletionState::PendingResults) {
		let event = tokio::time::timeout(RESPONSE_TIMEOUT, coordinator.next_event())
			.await
			.context("timed out waiting for completion response")?
			.context("event channel closed")?;
		coordinator.handle_event(event);
	}
	Ok(())
}

fn report(events: Vec<PopoverEvent>) {
	for event in events {
		match event {
			PopoverEvent::Show { id, anchor, items } => tracing::info!(id, anchor, items = items.len(), "trace.popover.show"),
			PopoverEvent::Update { id, items } => tracing::info!(id, items = items.len(), "trace.popover.update"),
			PopoverEvent::Close { id, reason } => tracing::info!(id, ?reason, "trace.popover.close"),
		}
	}
}

/// Prints everything the transport received since the last call.
async fn emit(client: &ClientHandle, transport: &RecordingTransport) -> anyhow::Result<()> {
	client.flush().await?;
	for message in transport.take() {
		println!("{}", message.to_json()?);
	}
	Ok(())
}
