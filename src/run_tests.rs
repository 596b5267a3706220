use std::sync::Arc;

use tempfile::tempdir;

use super::*;
use crate::chat::AttachmentRef;
use crate::config::{MultiSession, Settings};
use crate::fetcher::FileFetcher;
use crate::registry::RegistryStore;
use crate::session::SessionManager;
use crate::test_support::{FakeChatClient, FakeMuxerAdapter};
use crate::timing::Timing;

fn test_settings(allowed_users: Vec<String>) -> Settings {
    Settings {
        bot_token: "xoxb-test".to_owned(),
        app_token: "xapp-test".to_owned(),
        allowed_users,
        notify_channel: "C-NOTIFY".to_owned(),
        multi_session: MultiSession { max_concurrent: 5, ..MultiSession::default() },
    }
}

async fn test_state(
    allowed_users: Vec<String>,
) -> (Arc<AppState>, Arc<FakeMuxerAdapter>, Arc<FakeChatClient>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let registry = RegistryStore::new(dir.path().join("registry.json"), dir.path().join("registry.lock"));
    let muxer = Arc::new(FakeMuxerAdapter::new());
    let chat = Arc::new(FakeChatClient::new());
    let settings = test_settings(allowed_users);
    let sessions = SessionManager::new(registry, muxer.clone(), chat.clone(), settings.clone(), Timing::zeroed()).await;
    let fetch_root = dir.path().join("fetched");
    let fetcher = FileFetcher::with_client(fetch_root, "xoxb-test", reqwest::Client::new());
    let state = Arc::new(AppState { sessions, chat: chat.clone(), fetcher, settings, workspace_url: "https://example.slack.com/".to_owned() });
    (state, muxer, chat, dir)
}

fn new_thread_message(user: &str, channel: &str, ts: &str, text: &str) -> MessageEvent {
    MessageEvent {
        channel: channel.to_owned(),
        user: user.to_owned(),
        text: text.to_owned(),
        ts: ts.to_owned(),
        thread_ts: None,
        channel_type: None,
        subtype: None,
        files: Vec::new(),
    }
}

#[tokio::test]
async fn unauthorized_user_gets_a_refusal_and_no_session() {
    let (state, muxer, chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let msg = new_thread_message("U-STRANGER", "C1", "1.000", "hello");

    handle_inbound_event(&state, InboundEvent::Message(msg)).await.unwrap();

    assert!(muxer.windows.lock().unwrap().is_empty());
    let posted = chat.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].text, NOT_AUTHORIZED);
}

#[tokio::test]
async fn new_thread_message_creates_a_session_and_injects_text() {
    let (state, muxer, chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let msg = new_thread_message("U1", "C1", "1.000", "hello there");

    handle_inbound_event(&state, InboundEvent::Message(msg)).await.unwrap();

    assert_eq!(muxer.windows.lock().unwrap().len(), 1);
    let session = state.sessions.registry_get("1.000").expect("session persisted");
    assert_eq!(session.channel_id, "C1");

    let calls = muxer.calls.lock().unwrap();
    assert!(calls.iter().any(|c| matches!(c, crate::test_support::RecordedCall::SendKeysLiteral { text, .. } if text == "hello there")));

    let reactions = chat.reactions.lock().unwrap();
    assert!(reactions.iter().any(|r| r.name == "eyes" && r.added));
}

#[tokio::test]
async fn in_session_kill_directive_terminates_without_injecting() {
    let (state, muxer, _chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let first = new_thread_message("U1", "C1", "1.000", "start a session");
    handle_inbound_event(&state, InboundEvent::Message(first)).await.unwrap();
    assert_eq!(muxer.windows.lock().unwrap().len(), 1);

    let mut kill = new_thread_message("U1", "C1", "1.001", "!kill");
    kill.thread_ts = Some("1.000".to_owned());
    handle_inbound_event(&state, InboundEvent::Message(kill)).await.unwrap();

    assert!(muxer.windows.lock().unwrap().is_empty());
    let session = state.sessions.registry_get("1.000").unwrap();
    assert_eq!(session.status, crate::model::Status::Terminated);
}

#[tokio::test]
async fn reaction_terminate_kills_the_session() {
    let (state, muxer, chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let msg = new_thread_message("U1", "C1", "1.000", "start");
    handle_inbound_event(&state, InboundEvent::Message(msg)).await.unwrap();

    let reaction = ReactionEvent {
        user: "U1".to_owned(),
        reaction: "x".to_owned(),
        item_user: "BOTID".to_owned(),
        item: crate::chat::ReactionItem { channel: "C1".to_owned(), ts: "1.000".to_owned() },
    };
    handle_inbound_event(&state, InboundEvent::ReactionAdded(reaction)).await.unwrap();

    let calls = muxer.calls.lock().unwrap();
    assert!(calls.iter().any(|c| matches!(c, crate::test_support::RecordedCall::SendKeyNamed { key, .. } if key == "escape")));
    drop(calls);
    let _ = chat;
}

#[tokio::test]
async fn reaction_stop_sign_terminates_the_session_and_notifies() {
    let (state, muxer, chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let msg = new_thread_message("U1", "C1", "1.000", "start");
    handle_inbound_event(&state, InboundEvent::Message(msg)).await.unwrap();

    let reaction = ReactionEvent {
        user: "U1".to_owned(),
        reaction: "octagonal_sign".to_owned(),
        item_user: "BOTID".to_owned(),
        item: crate::chat::ReactionItem { channel: "C1".to_owned(), ts: "1.000".to_owned() },
    };
    handle_inbound_event(&state, InboundEvent::ReactionAdded(reaction)).await.unwrap();

    assert!(muxer.windows.lock().unwrap().is_empty());
    let posted = chat.posted.lock().unwrap();
    assert!(posted.iter().any(|p| p.text.contains("terminated")));
}

#[tokio::test]
async fn slash_command_help_returns_help_text() {
    let (state, _muxer, _chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let reply = handle_slash_command(&state, "U1", "C1", "/help", "").await;
    assert_eq!(reply, commands::HELP_TEXT);
}

#[tokio::test]
async fn slash_command_rejects_unauthorized_user() {
    let (state, _muxer, _chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let reply = handle_slash_command(&state, "U-OTHER", "C1", "/sessions", "").await;
    assert_eq!(reply, NOT_AUTHORIZED);
}

#[tokio::test]
async fn message_with_supported_attachment_is_fetched_before_injection() {
    let (state, _muxer, chat, _dir) = test_state(vec!["U1".to_owned()]).await;
    let mut msg = new_thread_message("U1", "C1", "1.000", "see attached");
    msg.files = vec![AttachmentRef { name: "notes.txt".to_owned(), url_private: "http://127.0.0.1:1/notes.txt".to_owned() }];

    // The fake fetch target is unreachable, so the download fails and the
    // message is still injected without the attachment (SPEC_FULL.md §4.5
    // treats download failure as non-fatal to the rest of the message).
    handle_inbound_event(&state, InboundEvent::Message(msg)).await.unwrap();
    let posted = chat.reactions.lock().unwrap();
    assert!(posted.iter().any(|r| r.name == "eyes"));
}
