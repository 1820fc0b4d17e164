use std::str::FromStr;

use lsp_types::{Position, Range, SaveOptions, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions};
use pretty_assertions::assert_eq;

use super::*;
use crate::client::RecordingTransport;

fn capabilities(kind: TextDocumentSyncKind) -> ServerCapabilities {
	ServerCapabilities {
		text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
			open_close: Some(true),
			change: Some(kind),
			save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions { include_text: Some(true) })),
			..Default::default()
		})),
		..Default::default()
	}
}

fn connect(kind: TextDocumentSyncKind) -> (Arc<RecordingTransport>, ClientHandle) {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let transport = Arc::new(RecordingTransport::new());
	let client = ClientHandle::new(transport.clone(), capabilities(kind), &WorkerRuntime::new());
	(transport, client)
}

fn uri() -> Uri {
	Uri::from_str("file:///tmp/stride/main.swift").unwrap()
}

fn open(client: &ClientHandle, text: &Rope) -> DocumentSync {
	let options = SyncOptions::default();
	DocumentSync::open(client.clone(), uri(), "swift", text, &options, &WorkerRuntime::new())
}

/// `(method, version)` for each recorded notification.
fn summary(transport: &RecordingTransport) -> Vec<(&'static str, Option<i32>)> {
	transport.notifications().iter().map(|n| (n.method(), n.version())).collect()
}

fn changes(transport: &RecordingTransport) -> Vec<DidChangeTextDocumentParams> {
	transport
		.notifications()
		.into_iter()
		.filter_map(|n| match n {
			Notification::DidChange(p) => Some(p),
			_ => None,
		})
		.collect()
}

#[tokio::test]
async fn incremental_versions_start_at_two_and_increase() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let mut text = Rope::from("foo");
	let sync = open(&client, &text);

	for (i, ch) in [".", "b", "a"].into_iter().enumerate() {
		text.insert(3 + i, ch);
		sync.did_insert(&text, 3 + i, ch);
	}
	sync.will_delete(&text, 5, 1);
	client.flush().await.unwrap();

	assert_eq!(
		summary(&transport),
		vec![
			("textDocument/didOpen", Some(1)),
			("textDocument/didChange", Some(2)),
			("textDocument/didChange", Some(3)),
			("textDocument/didChange", Some(4)),
			("textDocument/didChange", Some(5)),
		]
	);
	assert_eq!(sync.version(), 5);
}

#[tokio::test]
async fn incremental_insert_is_a_point_range() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let mut text = Rope::from("let x\nfoo");
	let sync = open(&client, &text);

	text.insert(9, ".");
	sync.did_insert(&text, 9, ".");
	client.flush().await.unwrap();

	let change = &changes(&transport)[0].content_changes[0];
	let at = Position { line: 1, character: 3 };
	assert_eq!(change.range, Some(Range { start: at, end: at }));
	assert_eq!(change.text, ".");
}

#[tokio::test]
async fn incremental_delete_covers_removed_span() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let text = Rope::from("hello world");
	let sync = open(&client, &text);

	sync.will_delete(&text, 6, 3);
	client.flush().await.unwrap();

	let change = &changes(&transport)[0].content_changes[0];
	assert_eq!(
		change.range,
		Some(Range {
			start: Position { line: 0, character: 6 },
			end: Position { line: 0, character: 9 },
		})
	);
	assert_eq!(change.text, "");
}

#[tokio::test]
async fn untranslatable_edit_is_skipped_without_version_bump() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let text = Rope::from("abc");
	let sync = open(&client, &text);

	sync.will_delete(&text, 2, 10);
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1))]);
	assert_eq!(sync.version(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_sync_coalesces_edits_within_interval() {
	let (transport, client) = connect(TextDocumentSyncKind::FULL);
	let mut text = Rope::from("");
	let sync = open(&client, &text);

	for (i, ch) in "hello".chars().enumerate() {
		text.insert_char(i, ch);
		sync.did_insert(&text, i, &ch.to_string());
	}
	assert!(sync.is_dirty());
	client.flush().await.unwrap();
	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1))], "no per-keystroke message");

	tokio::time::sleep(Duration::from_millis(1500)).await;
	client.flush().await.unwrap();

	let sent = changes(&transport);
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].text_document.version, 2);
	assert_eq!(sent[0].content_changes[0].range, None);
	assert_eq!(sent[0].content_changes[0].text, "hello");
	assert!(!sync.is_dirty());

	text.remove(0..1);
	sync.did_delete(&text);
	tokio::time::sleep(Duration::from_millis(1500)).await;
	client.flush().await.unwrap();

	let sent = changes(&transport);
	assert_eq!(sent.len(), 2);
	assert_eq!(sent[1].text_document.version, 3);
	assert_eq!(sent[1].content_changes[0].text, "ello");
}

#[tokio::test(start_paused = true)]
async fn full_sync_is_idle_while_clean() {
	let (transport, client) = connect(TextDocumentSyncKind::FULL);
	let sync = open(&client, &Rope::from("abc"));

	tokio::time::sleep(Duration::from_secs(5)).await;
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1))]);
	assert_eq!(sync.version(), 1);
}

#[tokio::test(start_paused = true)]
async fn close_discards_pending_full_sync() {
	let (transport, client) = connect(TextDocumentSyncKind::FULL);
	let mut text = Rope::from("abc");
	let sync = open(&client, &text);

	text.insert(3, "d");
	sync.did_insert(&text, 3, "d");
	sync.close();

	tokio::time::sleep(Duration::from_secs(3)).await;
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1)), ("textDocument/didClose", None)]);
}

#[tokio::test]
async fn manual_flush_sends_once() {
	let (transport, client) = connect(TextDocumentSyncKind::FULL);
	let mut text = Rope::from("ab");
	let sync = open(&client, &text);

	assert!(!sync.flush_full_sync());
	text.insert(2, "c");
	sync.did_insert(&text, 2, "c");
	assert!(sync.flush_full_sync());
	assert!(!sync.flush_full_sync());
	client.flush().await.unwrap();

	let sent = changes(&transport);
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].content_changes[0].text, "abc");
}

#[tokio::test]
async fn none_mode_only_opens_and_closes() {
	let (transport, client) = connect(TextDocumentSyncKind::NONE);
	let mut text = Rope::from("abc");
	let sync = open(&client, &text);
	assert_eq!(sync.mode(), SyncMode::None);

	text.insert(0, "x");
	sync.did_insert(&text, 0, "x");
	sync.will_delete(&text, 0, 1);
	sync.close();
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1)), ("textDocument/didClose", None)]);
}

#[tokio::test]
async fn reopen_restarts_at_version_one() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let mut text = Rope::from("a");
	let sync = open(&client, &text);
	text.insert(1, "b");
	sync.did_insert(&text, 1, "b");
	sync.close();

	let sync = open(&client, &text);
	text.insert(2, "c");
	sync.did_insert(&text, 2, "c");
	client.flush().await.unwrap();

	assert_eq!(
		summary(&transport),
		vec![
			("textDocument/didOpen", Some(1)),
			("textDocument/didChange", Some(2)),
			("textDocument/didClose", None),
			("textDocument/didOpen", Some(1)),
			("textDocument/didChange", Some(2)),
		]
	);
}

#[tokio::test]
async fn did_save_includes_text_when_requested() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let text = Rope::from("saved");
	let sync = open(&client, &text);
	sync.did_save(&text);
	client.flush().await.unwrap();

	let notifications = transport.notifications();
	let Some(Notification::DidSave(params)) = notifications.last() else {
		panic!("expected didSave, got {notifications:?}");
	};
	assert_eq!(params.text.as_deref(), Some("saved"));
}

#[tokio::test]
async fn did_save_can_be_disabled() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	let text = Rope::from("x");
	let options = SyncOptions {
		send_did_save: false,
		..SyncOptions::default()
	};
	let sync = DocumentSync::open(client.clone(), uri(), "swift", &text, &options, &WorkerRuntime::new());
	sync.did_save(&text);
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1))]);
}

#[tokio::test]
async fn transport_failures_do_not_stop_later_notifications() {
	let (transport, client) = connect(TextDocumentSyncKind::INCREMENTAL);
	transport.fail_notifications(true);
	let mut text = Rope::from("a");
	let sync = open(&client, &text);
	text.insert(1, "b");
	sync.did_insert(&text, 1, "b");
	client.flush().await.unwrap();

	assert_eq!(summary(&transport), vec![("textDocument/didOpen", Some(1)), ("textDocument/didChange", Some(2))]);
}
