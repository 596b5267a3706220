//! Test doubles for the Muxer Adapter and Chat Client. Used across scenario
//! tests so assertions don't depend on a real `tmux` binary or network
//! access.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::{AuthInfo, ChatClient, Destination};
use crate::error::AdapterError;
use crate::muxer::MuxerAdapter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    NewWindow { name: String, working_dir: String },
    KillWindow { name: String },
    RenameWindow { from: String, to: String },
    SendKeysLiteral { window: String, text: String },
    SendKeyNamed { window: String, key: String },
}

#[derive(Default)]
pub struct FakeMuxerAdapter {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub windows: Mutex<Vec<String>>,
    /// Scripted pane captures, consumed one at a time per call to
    /// `capture_pane`; the last one repeats once exhausted.
    pub captures: Mutex<Vec<String>>,
}

impl FakeMuxerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_captures(captures: Vec<String>) -> Self {
        Self { captures: Mutex::new(captures), ..Self::default() }
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MuxerAdapter for FakeMuxerAdapter {
    async fn has_session(&self) -> Result<bool, AdapterError> {
        Ok(true)
    }

    async fn list_windows(&self) -> Result<Vec<String>, AdapterError> {
        Ok(self.windows.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn new_window(&self, name: &str, working_dir: &str) -> Result<(), AdapterError> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).push(name.to_owned());
        self.lock_calls().push(RecordedCall::NewWindow { name: name.to_owned(), working_dir: working_dir.to_owned() });
        Ok(())
    }

    async fn kill_window(&self, name: &str) -> Result<(), AdapterError> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).retain(|w| w != name);
        self.lock_calls().push(RecordedCall::KillWindow { name: name.to_owned() });
        Ok(())
    }

    async fn rename_window(&self, from: &str, to: &str) -> Result<(), AdapterError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        for w in windows.iter_mut() {
            if w == from {
                *w = to.to_owned();
            }
        }
        drop(windows);
        self.lock_calls().push(RecordedCall::RenameWindow { from: from.to_owned(), to: to.to_owned() });
        Ok(())
    }

    async fn capture_pane(&self, _window: &str) -> Result<String, AdapterError> {
        let mut captures = self.captures.lock().unwrap_or_else(|e| e.into_inner());
        if captures.is_empty() {
            return Ok(String::new());
        }
        if captures.len() == 1 {
            Ok(captures[0].clone())
        } else {
            Ok(captures.remove(0))
        }
    }

    async fn send_keys_literal(&self, window: &str, text: &str) -> Result<(), AdapterError> {
        self.lock_calls().push(RecordedCall::SendKeysLiteral { window: window.to_owned(), text: text.to_owned() });
        Ok(())
    }

    async fn send_key_named(&self, window: &str, key: &str) -> Result<(), AdapterError> {
        self.lock_calls().push(RecordedCall::SendKeyNamed { window: window.to_owned(), key: key.to_owned() });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: String,
    pub thread_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionCall {
    pub channel_id: String,
    pub message_id: String,
    pub name: String,
    pub added: bool,
}

#[derive(Default)]
pub struct FakeChatClient {
    pub posted: Mutex<Vec<PostedMessage>>,
    pub reactions: Mutex<Vec<ReactionCall>>,
}

impl FakeChatClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn post_message(&self, dest: &Destination, text: &str) -> anyhow::Result<String> {
        let mut posted = self.posted.lock().unwrap_or_else(|e| e.into_inner());
        posted.push(PostedMessage { channel_id: dest.channel_id.clone(), thread_id: dest.thread_id.clone(), text: text.to_owned() });
        Ok(format!("{}.{}", dest.channel_id, posted.len()))
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()> {
        self.reactions.lock().unwrap_or_else(|e| e.into_inner()).push(ReactionCall {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
            name: name.to_owned(),
            added: true,
        });
        Ok(())
    }

    async fn remove_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()> {
        self.reactions.lock().unwrap_or_else(|e| e.into_inner()).push(ReactionCall {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
            name: name.to_owned(),
            added: false,
        });
        Ok(())
    }

    async fn auth_test(&self) -> anyhow::Result<AuthInfo> {
        Ok(AuthInfo { url: "https://example.slack.com/".to_owned(), user_id: "BOTID".to_owned() })
    }

    async fn conversations_open(&self, user_id: &str) -> anyhow::Result<String> {
        Ok(format!("D-{user_id}"))
    }
}
