//! End-to-end scenarios from SPEC_FULL.md §8, driven through
//! `run::handle_inbound_event`/`handle_slash_command` against fake
//! muxer/chat backends so no real `tmux` or network is required.

use std::sync::Arc;

use chatmux_bridge::chat::{AttachmentRef, InboundEvent, MessageEvent, ReactionEvent, ReactionItem};
use chatmux_bridge::config::{MultiSession, Settings};
use chatmux_bridge::fetcher::FileFetcher;
use chatmux_bridge::model::Status;
use chatmux_bridge::registry::RegistryStore;
use chatmux_bridge::run;
use chatmux_bridge::server::AppState;
use chatmux_bridge::session::SessionManager;
use chatmux_bridge::test_support::{FakeChatClient, FakeMuxerAdapter, RecordedCall};
use chatmux_bridge::timing::Timing;

fn message(channel: &str, user: &str, ts: &str, thread_ts: Option<&str>, text: &str) -> MessageEvent {
    MessageEvent {
        channel: channel.to_owned(),
        user: user.to_owned(),
        text: text.to_owned(),
        ts: ts.to_owned(),
        thread_ts: thread_ts.map(str::to_owned),
        channel_type: None,
        subtype: None,
        files: Vec::new(),
    }
}

struct Harness {
    state: Arc<AppState>,
    muxer: Arc<FakeMuxerAdapter>,
    chat: Arc<FakeChatClient>,
    _dir: tempfile::TempDir,
}

async fn harness(max_concurrent: u32) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = RegistryStore::new(dir.path().join("registry.json"), dir.path().join("registry.lock"));
    let muxer = Arc::new(FakeMuxerAdapter::new());
    let chat = Arc::new(FakeChatClient::new());
    let settings = Settings {
        bot_token: "xoxb-test".to_owned(),
        app_token: "xapp-test".to_owned(),
        allowed_users: vec!["U1".to_owned()],
        notify_channel: "C-NOTIFY".to_owned(),
        multi_session: MultiSession { max_concurrent, ..MultiSession::default() },
    };
    let sessions = SessionManager::new(registry, muxer.clone(), chat.clone(), settings.clone(), Timing::zeroed()).await;
    let fetcher = FileFetcher::with_client(dir.path().join("fetched"), "xoxb-test", reqwest::Client::new());
    let state = Arc::new(AppState { sessions, chat: chat.clone(), fetcher, settings, workspace_url: String::new() });
    Harness { state, muxer, chat, _dir: dir }
}

#[tokio::test]
async fn scenario_1_new_thread_with_working_directory() {
    let h = harness(5).await;
    std::fs::create_dir_all("/tmp").ok();
    let msg = message("D1", "U1", "1001.0", None, "[/tmp] fix thing");

    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    let session = h.state.sessions.registry_get("1001.0").expect("session created");
    assert_eq!(session.working_dir, "/tmp");
    assert_eq!(session.window, "new-1");
    assert_eq!(session.status, Status::Starting);

    let calls = h.muxer.calls.lock().unwrap();
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::NewWindow { name, working_dir } if name == "new-1" && working_dir == "/tmp")));
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::SendKeysLiteral { text, .. } if text == "1")));
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::SendKeysLiteral { text, .. } if text == "fix thing")));

    let reactions = h.chat.reactions.lock().unwrap();
    assert!(reactions.iter().any(|r| r.name == "eyes" && r.added));
}

#[tokio::test]
async fn scenario_2_second_message_same_thread_sends_bare_digit() {
    let h = harness(5).await;
    let first = message("D1", "U1", "1001.0", None, "start things up");
    run::handle_inbound_event(&h.state, InboundEvent::Message(first)).await.unwrap();

    let second = message("D1", "U1", "1001.3", Some("1001.0"), "2");
    run::handle_inbound_event(&h.state, InboundEvent::Message(second)).await.unwrap();

    assert_eq!(h.muxer.windows.lock().unwrap().len(), 1, "no new window for a thread reply");
    let calls = h.muxer.calls.lock().unwrap();
    assert!(calls.contains(&RecordedCall::SendKeysLiteral { window: "new-1".to_owned(), text: "2".to_owned() }));
}

#[tokio::test]
async fn scenario_3_permission_prompt_amendment_clears_pending_permission() {
    let h = harness(5).await;
    let first = message("D1", "U1", "1001.0", None, "start");
    run::handle_inbound_event(&h.state, InboundEvent::Message(first)).await.unwrap();
    let mut session = h.state.sessions.registry_get("1001.0").unwrap();
    session.pending_permission = true;
    RegistryStore::new(h._dir.path().join("registry.json"), h._dir.path().join("registry.lock"))
        .put(session)
        .unwrap();

    let amendment = message("D1", "U1", "1001.4", Some("1001.0"), "3 try the other file");
    run::handle_inbound_event(&h.state, InboundEvent::Message(amendment)).await.unwrap();

    let calls = h.muxer.calls.lock().unwrap();
    let downs = calls.iter().filter(|c| matches!(c, RecordedCall::SendKeyNamed { key, .. } if key == "down")).count();
    assert_eq!(downs, 2, "option 3 needs two Down presses");
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::SendKeyNamed { key, .. } if key == "tab")));
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::SendKeysLiteral { text, .. } if text == "try the other file")));

    let stored = h.state.sessions.registry_get("1001.0").unwrap();
    assert!(!stored.pending_permission);
}

#[tokio::test]
async fn scenario_4_attachment_flow_flags_unsupported_files() {
    let h = harness(5).await;
    let mut msg = message("D1", "U1", "1001.0", None, "see attached");
    msg.files = vec![AttachmentRef { name: "a.png".to_owned(), url_private: "http://127.0.0.1:1/a.png".to_owned() }];

    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    // The fake endpoint is unreachable so the download itself fails (no real
    // network in this test), but the text still reaches the window and the
    // "eyes" reaction still lands — the non-fatal-download-failure path.
    let reactions = h.chat.reactions.lock().unwrap();
    assert!(reactions.iter().any(|r| r.name == "eyes"));
}

#[tokio::test]
async fn scenario_5_reaction_kill_terminates_and_notifies() {
    let h = harness(5).await;
    let msg = message("D1", "U1", "2002.0", None, "start");
    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    let reaction = ReactionEvent {
        user: "U1".to_owned(),
        reaction: "octagonal_sign".to_owned(),
        item_user: "BOTID".to_owned(),
        item: ReactionItem { channel: "D1".to_owned(), ts: "2002.0".to_owned() },
    };
    run::handle_inbound_event(&h.state, InboundEvent::ReactionAdded(reaction)).await.unwrap();

    assert!(h.muxer.windows.lock().unwrap().is_empty());
    let session = h.state.sessions.registry_get("2002.0").unwrap();
    assert_eq!(session.status, Status::Terminated);
    let posted = h.chat.posted.lock().unwrap();
    assert!(posted.iter().any(|p| p.text.contains("terminated")));
}

#[tokio::test]
async fn scenario_6_resurrection_reuses_assistant_id_and_prior_window() {
    let h = harness(5).await;
    let mut prior = chatmux_bridge::model::Session::new_starting("3003.0", "D1", "abcd1234", "/x", 0);
    prior.status = Status::Terminated;
    prior.assistant_id = Some("abcd1234-5678".to_owned());
    RegistryStore::new(h._dir.path().join("registry.json"), h._dir.path().join("registry.lock"))
        .put(prior)
        .unwrap();

    let msg = message("D1", "U1", "3003.9", Some("3003.0"), "hello");
    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    let session = h.state.sessions.registry_get("3003.0").unwrap();
    assert_eq!(session.window, "abcd1234");
    assert_eq!(session.assistant_id.as_deref(), Some("abcd1234-5678"));
    assert_eq!(session.working_dir, "/x");
    assert_eq!(session.status, Status::Starting);
}

#[tokio::test]
async fn kill_window_twice_is_not_an_error() {
    let h = harness(5).await;
    let msg = message("D1", "U1", "4004.0", None, "start");
    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    h.state.sessions.terminate("4004.0", false).await.unwrap();
    h.state.sessions.terminate("4004.0", false).await.unwrap();
    assert_eq!(h.state.sessions.registry_get("4004.0").unwrap().status, Status::Terminated);
}

#[tokio::test]
async fn max_concurrent_zero_rejects_every_new_thread() {
    let h = harness(0).await;
    let msg = message("D1", "U1", "5005.0", None, "hello");
    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    assert!(h.muxer.windows.lock().unwrap().is_empty());
    assert!(h.state.sessions.registry_get("5005.0").is_none());
}

#[tokio::test]
async fn empty_text_with_no_attachments_is_a_no_op_injection() {
    let h = harness(5).await;
    let msg = message("D1", "U1", "6006.0", None, "");
    run::handle_inbound_event(&h.state, InboundEvent::Message(msg)).await.unwrap();

    let calls = h.muxer.calls.lock().unwrap();
    assert!(!calls.iter().any(|c| matches!(c, RecordedCall::SendKeysLiteral { .. })));
}
