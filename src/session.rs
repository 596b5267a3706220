//! The Session Manager (SPEC_FULL.md §4.3) — the core component: creation,
//! resurrection, readiness detection, inbound injection, keystroke policy
//! dispatch, and the three periodic sweeps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::chat::{ChatClient, Destination};
use crate::config::Settings;
use crate::dedup;
use crate::error::{AdapterError, ErrorCode};
use crate::keystroke::{self, SleepKind, Step};
use crate::model::{assistant_window_name, is_provisional_window_name, now_epoch, provisional_window_name, Session, Status};
use crate::muxer::MuxerAdapter;
use crate::registry::RegistryStore;
use crate::timing::Timing;

const TRUST_PROMPT_MARKERS: &[&str] = &["do you trust", "trust the files", "trust this folder", "trust this workspace"];
const READY_MARKERS: &[&str] = &["what would you like to do?", "welcome to", ">"];

/// True if the pane capture still shows a trust-this-folder dialog
/// (SPEC_FULL.md §4.3.2), via a tail-line substring scan.
pub fn is_trust_prompt(screen: &str) -> bool {
    tail_contains_any(screen, TRUST_PROMPT_MARKERS)
}

/// True if the pane capture shows a known ready marker.
pub fn is_ready(screen: &str) -> bool {
    tail_contains_any(screen, READY_MARKERS)
}

fn tail_contains_any(screen: &str, markers: &[&str]) -> bool {
    let lines: Vec<&str> = screen.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let start = lines.len().saturating_sub(5);
    let tail = lines[start..].join(" ").to_lowercase();
    markers.iter().any(|m| tail.contains(m))
}

/// Per-thread single-flight creation lock: the "coalesce duplicate work"
/// pattern (SPEC_FULL.md §9 design notes), structurally identical to how the
/// teacher's state store guards its map of session state.
#[derive(Default)]
struct CreationLocks {
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CreationLocks {
    fn for_thread(&self, thread_id: &str) -> Arc<AsyncMutex<()>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).entry(thread_id.to_owned()).or_default().clone()
    }
}

pub struct SessionManager {
    registry: RegistryStore,
    muxer: Arc<dyn MuxerAdapter>,
    chat: Arc<dyn ChatClient>,
    settings: Settings,
    timing: Timing,
    creation_locks: CreationLocks,
    next_window: AtomicU64,
}

impl SessionManager {
    /// Seeds the provisional-window counter from the muxer's own window list
    /// (SPEC_FULL.md §4.3.1: "seeded at startup from the max provisional
    /// index found in existing muxer windows") rather than the Registry,
    /// since the Registry can be stale or wiped relative to what tmux
    /// actually has.
    pub async fn new(
        registry: RegistryStore,
        muxer: Arc<dyn MuxerAdapter>,
        chat: Arc<dyn ChatClient>,
        settings: Settings,
        timing: Timing,
    ) -> Self {
        let next_window = AtomicU64::new(next_provisional_index(&muxer).await);
        Self { registry, muxer, chat, settings, timing, creation_locks: CreationLocks::default(), next_window }
    }

    /// `ensureSession(threadId, channelId, requestedDir?)` (SPEC_FULL.md
    /// §4.3.1).
    pub async fn ensure_session(
        &self,
        thread_id: &str,
        channel_id: &str,
        requested_dir: Option<&str>,
    ) -> Result<Session, AdapterError> {
        let lock = self.creation_locks.for_thread(thread_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.registry.get(thread_id) {
            if !existing.status.is_terminated() {
                return Ok(existing);
            }
        }

        let active_count = self
            .registry
            .load()
            .values()
            .filter(|s| !s.status.is_terminated())
            .count() as u32;
        if active_count >= self.settings.multi_session.max_concurrent {
            return Err(AdapterError::new(ErrorCode::LimitReached, "maxConcurrent sessions already running"));
        }

        let prior = self.registry.get(thread_id).filter(|s| s.resurrectable());
        let working_dir = requested_dir
            .map(str::to_owned)
            .or_else(|| prior.as_ref().map(|s| s.working_dir.clone()))
            .unwrap_or_else(|| self.settings.multi_session.default_working_dir.clone());

        let session = match prior {
            Some(prior) => self.resurrect(thread_id, channel_id, &working_dir, &prior).await?,
            None => self.create_new(thread_id, channel_id, &working_dir).await?,
        };

        self.registry.put(session.clone()).map_err(|e| AdapterError::unknown(e.to_string()))?;
        Ok(session)
    }

    async fn create_new(&self, thread_id: &str, channel_id: &str, working_dir: &str) -> Result<Session, AdapterError> {
        let index = self.next_window.fetch_add(1, Ordering::SeqCst);
        let window = provisional_window_name(index);
        self.muxer.new_window(&window, working_dir).await?;
        // Trust-dialog auto-confirmation fires on a delay; the caller
        // schedules it once the window exists (see `schedule_trust_confirm`).
        Ok(Session::new_starting(thread_id, channel_id, window, working_dir, now_epoch()))
    }

    async fn resurrect(
        &self,
        thread_id: &str,
        channel_id: &str,
        working_dir: &str,
        prior: &Session,
    ) -> Result<Session, AdapterError> {
        // Resurrection keeps the prior (non-provisional) window name; the
        // real adapter launches with `--resume <assistantId>` when it spawns
        // the assistant subprocess into the new window.
        self.muxer.new_window(&prior.window, working_dir).await?;
        let mut session = Session::new_starting(thread_id, channel_id, prior.window.clone(), working_dir, now_epoch());
        session.assistant_id = prior.assistant_id.clone();
        Ok(session)
    }

    /// Send the delayed trust-dialog auto-confirmation keystroke
    /// (SPEC_FULL.md §4.3.1: a single `"1"` after ~2s).
    pub async fn confirm_trust_dialog(&self, window: &str) -> Result<(), AdapterError> {
        tokio::time::sleep(self.timing.trust_prompt_delay).await;
        self.muxer.send_keys_literal(window, "1").await
    }

    /// Poll `capture(window)` until a ready marker appears, a trust prompt
    /// clears, or the deadline elapses (SPEC_FULL.md §4.3.2).
    pub async fn wait_until_ready(&self, window: &str) {
        let deadline = tokio::time::Instant::now() + self.timing.readiness_deadline;
        loop {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            match self.muxer.capture_pane(window).await {
                Ok(screen) if is_trust_prompt(&screen) => {}
                Ok(screen) if is_ready(&screen) => break,
                _ => {}
            }
            tokio::time::sleep(self.timing.readiness_poll_interval).await;
        }
        tokio::time::sleep(self.timing.readiness_settle).await;
    }

    /// Inbound message injection (SPEC_FULL.md §4.3.3).
    pub async fn inject(
        &self,
        session: &Session,
        text: &str,
        attachment_paths: &[std::path::PathBuf],
        inbound_message_id: &str,
    ) -> anyhow::Result<()> {
        for path in attachment_paths {
            let path_str = path.to_string_lossy().into_owned();
            dedup::mark_pending(&session.thread_id, &path_str)?;
            self.muxer.send_keys_literal(&session.window, &path_str).await?;
            self.muxer.send_key_named(&session.window, "enter").await?;
            tokio::time::sleep(self.timing.double_enter_gap).await;
            self.muxer.send_key_named(&session.window, "enter").await?;
            tokio::time::sleep(self.timing.attachment_gap).await;
        }

        let dest = Destination { channel_id: session.channel_id.clone(), thread_id: Some(session.thread_id.clone()) };
        self.chat.add_reaction(&dest.channel_id, inbound_message_id, "eyes").await?;
        self.registry.update(|map| {
            if let Some(s) = map.get_mut(&session.thread_id) {
                s.last_inbound_message_id = Some(inbound_message_id.to_owned());
            }
        })?;

        if text.trim().is_empty() {
            return Ok(());
        }

        // `!say <text>` bypasses the pendingPermission "3 " rewrite and
        // delivers the rest of the message verbatim (SPEC_FULL.md §9).
        let (text, say_escape) = match text.strip_prefix("!say ") {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        let mut text_to_send = text.to_owned();
        let is_selection = keystroke::is_option_selection(text);
        if !say_escape && session.pending_permission && !is_selection {
            text_to_send = format!("3 {text}");
            self.registry.update(|map| {
                if let Some(s) = map.get_mut(&session.thread_id) {
                    s.pending_permission = false;
                }
            })?;
        }

        // Hash the original text, not `text_to_send`: the `"3 " + text`
        // rewrite only steers option selection (Down/Tab), the amendment
        // instructions actually literal-typed are `text` itself (see
        // `keystroke::plan`'s `OptionWithInstructions` branch), so that's
        // what the external prompt-forwarding hook will hash too.
        dedup::mark_pending(&session.thread_id, text)?;
        self.send(&session.window, &text_to_send).await?;

        if keystroke::is_plain_rejection(&text_to_send) {
            let chat = self.chat.clone();
            let dest = dest.clone();
            let message_id = inbound_message_id.to_owned();
            let delay = self.timing.rejection_reaction_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = chat.remove_reaction(&dest.channel_id, &message_id, "eyes").await;
            });
        }

        Ok(())
    }

    /// `send(window, text)` (SPEC_FULL.md §4.3.4).
    pub async fn send(&self, window: &str, text: &str) -> Result<(), AdapterError> {
        for step in keystroke::plan(text) {
            match step {
                Step::Literal(text) => self.muxer.send_keys_literal(window, &text).await?,
                Step::Key(key) => self.muxer.send_key_named(window, key).await?,
                Step::Sleep(kind) => tokio::time::sleep(self.sleep_duration(kind)).await,
            }
        }
        Ok(())
    }

    fn sleep_duration(&self, kind: SleepKind) -> std::time::Duration {
        match kind {
            SleepKind::DownKeyGap => self.timing.down_key_gap,
            SleepKind::AmendmentOpen => self.timing.amendment_open_delay,
            SleepKind::AmendmentSubmit => self.timing.amendment_submit_delay,
            SleepKind::DoubleEnterGap => self.timing.double_enter_gap,
        }
    }

    /// Raw named-key passthrough, bypassing the chat-text classify pipeline
    /// entirely — for reactions that map directly to a keypress rather than
    /// a piece of text to classify (SPEC_FULL.md §4.4 reaction table).
    pub async fn send_key(&self, window: &str, key: &'static str) -> Result<(), AdapterError> {
        self.muxer.send_key_named(window, key).await
    }

    /// Kill the window (idempotent), mark `terminated`, preserve
    /// `assistantId` (SPEC_FULL.md §4.3.6).
    pub async fn terminate(&self, thread_id: &str, notify: bool) -> anyhow::Result<()> {
        let Some(session) = self.registry.get(thread_id) else { return Ok(()) };
        self.muxer.kill_window(&session.window).await?;
        self.registry.update(|map| {
            if let Some(s) = map.get_mut(thread_id) {
                s.status = Status::Terminated;
            }
        })?;
        if notify {
            let dest = Destination { channel_id: session.channel_id.clone(), thread_id: Some(thread_id.to_owned()) };
            self.chat.post_message(&dest, "Session terminated.").await?;
        }
        Ok(())
    }

    /// Idle sweep (SPEC_FULL.md §4.3.5): every `idle` Session whose
    /// `(now - idleSince) > idleTimeoutMinutes` is terminated.
    pub async fn sweep_idle(&self) -> anyhow::Result<()> {
        let now = now_epoch();
        let timeout_secs = self.settings.multi_session.idle_timeout_minutes * 60;
        let due: Vec<String> = self
            .registry
            .load()
            .values()
            .filter(|s| {
                s.status == Status::Idle
                    && s.idle_since.is_some_and(|since| now.saturating_sub(since) > timeout_secs)
            })
            .map(|s| s.thread_id.clone())
            .collect();
        for thread_id in due {
            self.terminate(&thread_id, self.settings.multi_session.notify_on_timeout).await?;
        }
        Ok(())
    }

    /// Crash sweep (SPEC_FULL.md §4.3.5): any non-terminated Session whose
    /// window no longer exists is marked terminated with a distinct warning.
    pub async fn sweep_crashed(&self) -> anyhow::Result<()> {
        let windows = self.muxer.list_windows().await.unwrap_or_default();
        let crashed: Vec<Session> = self
            .registry
            .load()
            .values()
            .filter(|s| !s.status.is_terminated() && !windows.contains(&s.window))
            .cloned()
            .collect();
        for session in crashed {
            self.registry.update(|map| {
                if let Some(s) = map.get_mut(&session.thread_id) {
                    s.status = Status::Terminated;
                }
            })?;
            let dest =
                Destination { channel_id: session.channel_id.clone(), thread_id: Some(session.thread_id.clone()) };
            self.chat.post_message(&dest, "Session window disappeared unexpectedly (crash).").await?;
        }
        Ok(())
    }

    /// Read-only registry access for the Inbound Router and Bot Command
    /// Handler, which never mutate a [`Session`] directly.
    pub fn registry_get(&self, thread_id: &str) -> Option<Session> {
        self.registry.get(thread_id)
    }

    pub fn registry_load(&self) -> HashMap<String, Session> {
        self.registry.load()
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub async fn muxer_has_session(&self) -> bool {
        self.muxer.has_session().await.unwrap_or(false)
    }

    /// Startup reconciliation: any non-terminated Session whose window is
    /// absent is marked terminated immediately, no notification (§9).
    pub async fn reconcile_at_startup(&self) -> anyhow::Result<()> {
        let windows = self.muxer.list_windows().await.unwrap_or_default();
        let stale: Vec<String> = self
            .registry
            .load()
            .values()
            .filter(|s| !s.status.is_terminated() && !windows.contains(&s.window))
            .map(|s| s.thread_id.clone())
            .collect();
        for thread_id in stale {
            self.registry.update(|map| {
                if let Some(s) = map.get_mut(&thread_id) {
                    s.status = Status::Terminated;
                }
            })?;
        }
        Ok(())
    }
}

async fn next_provisional_index(muxer: &Arc<dyn MuxerAdapter>) -> u64 {
    muxer
        .list_windows()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|name| {
            if is_provisional_window_name(name) {
                name.strip_prefix("new-")?.parse::<u64>().ok()
            } else {
                None
            }
        })
        .max()
        .map_or(1, |max| max + 1)
}

/// Resolve a freshly-learned `assistantId` into the permanent window name
/// once the assistant's own identifier is known — mirrors what the external
/// notify hook does on `Stop` (SPEC_FULL.md §6), exposed here only so the
/// registry's half of that rename is exercised in our own tests.
pub fn permanent_window_name(assistant_id: &str) -> String {
    assistant_window_name(assistant_id)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
