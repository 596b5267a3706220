//! The `Session` data model (SPEC_FULL.md §3).

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Starting,
    Active,
    Idle,
    Terminated,
}

impl Status {
    pub fn is_terminated(self) -> bool {
        matches!(self, Status::Terminated)
    }
}

/// A chat thread ↔ terminal window binding, the unit the whole bridge
/// revolves around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub thread_id: String,
    pub channel_id: String,
    pub window: String,
    pub assistant_id: Option<String>,
    pub working_dir: String,
    pub status: Status,
    pub created_at: u64,
    pub last_activity: u64,
    pub idle_since: Option<u64>,
    pub last_inbound_message_id: Option<String>,
    #[serde(default)]
    pub pending_permission: bool,
    /// Bookkeeping only, not load-bearing for any invariant — last time this
    /// record was written, so an operator inspecting the registry file can
    /// tell how stale an entry is.
    #[serde(default)]
    pub updated_at: u64,
}

/// Fixed prefix length `assistantId` is truncated to when naming a window
/// (SPEC_FULL.md §3: "`window` either matches `assistantId` (truncated to a
/// fixed prefix length, 8)...").
pub const ASSISTANT_ID_WINDOW_PREFIX: usize = 8;

/// Render the provisional window name for a given counter value.
pub fn provisional_window_name(n: u64) -> String {
    format!("new-{n}")
}

/// True if `name` looks like a provisional window name (`new-<N>`).
pub fn is_provisional_window_name(name: &str) -> bool {
    name.strip_prefix("new-").is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Truncate an assistant id to the fixed window-name prefix length.
pub fn assistant_window_name(assistant_id: &str) -> String {
    assistant_id.chars().take(ASSISTANT_ID_WINDOW_PREFIX).collect()
}

impl Session {
    pub fn new_starting(
        thread_id: impl Into<String>,
        channel_id: impl Into<String>,
        window: impl Into<String>,
        working_dir: impl Into<String>,
        now: u64,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            channel_id: channel_id.into(),
            window: window.into(),
            assistant_id: None,
            working_dir: working_dir.into(),
            status: Status::Starting,
            created_at: now,
            last_activity: now,
            idle_since: None,
            last_inbound_message_id: None,
            pending_permission: false,
            updated_at: now,
        }
    }

    /// A `terminated` session eligible for resurrection: known assistant id
    /// and a non-provisional window (SPEC_FULL.md §4.3.1 step 4).
    pub fn resurrectable(&self) -> bool {
        self.status.is_terminated()
            && self.assistant_id.is_some()
            && !is_provisional_window_name(&self.window)
    }
}

/// Current epoch seconds. Centralized so tests can reason about monotonic
/// ordering without depending on `SystemTime` directly.
pub fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
