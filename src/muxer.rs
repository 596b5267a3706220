//! The Muxer Adapter (SPEC_FULL.md §4.2) — a `tmux` CLI facade. Every
//! invocation goes through [`TmuxAdapter::tmux_async_cmd`] so socket/session
//! targeting stays centralized.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::AdapterError;

/// Operations the Session Manager needs from the muxer, abstracted so tests
/// can substitute a fake (SPEC_FULL.md §8).
#[async_trait]
pub trait MuxerAdapter: Send + Sync {
    async fn has_session(&self) -> Result<bool, AdapterError>;
    async fn list_windows(&self) -> Result<Vec<String>, AdapterError>;
    async fn new_window(&self, name: &str, working_dir: &str) -> Result<(), AdapterError>;
    /// Idempotent: killing an absent window is not an error.
    async fn kill_window(&self, name: &str) -> Result<(), AdapterError>;
    async fn rename_window(&self, from: &str, to: &str) -> Result<(), AdapterError>;
    async fn capture_pane(&self, window: &str) -> Result<String, AdapterError>;
    async fn send_keys_literal(&self, window: &str, text: &str) -> Result<(), AdapterError>;
    async fn send_key_named(&self, window: &str, key: &str) -> Result<(), AdapterError>;
}

/// Real implementation, shelling out to the `tmux` binary.
pub struct TmuxAdapter {
    session: String,
    socket: Option<PathBuf>,
}

impl TmuxAdapter {
    pub fn new(session: impl Into<String>) -> Self {
        Self { session: session.into(), socket: None }
    }

    pub fn with_socket(mut self, socket: PathBuf) -> Self {
        self.socket = Some(socket);
        self
    }

    fn tmux_async_cmd(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("tmux");
        if let Some(ref s) = self.socket {
            cmd.arg("-S").arg(s);
        }
        cmd
    }

    fn target(&self, window: &str) -> String {
        format!("{}:{window}", self.session)
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, AdapterError> {
        self.tmux_async_cmd()
            .args(args)
            .output()
            .await
            .map_err(|e| AdapterError::transient(format!("spawning tmux failed: {e}")))
    }

    /// Classify a non-zero tmux exit into `NotFound` vs `Unknown`, the way
    /// `coop::error::ErrorCode` centralizes a small closed categorization.
    fn classify_failure(stderr: &str) -> AdapterError {
        let lower = stderr.to_lowercase();
        if lower.contains("can't find window") || lower.contains("no such") || lower.contains("session not found") {
            AdapterError::not_found(stderr.trim().to_owned())
        } else {
            AdapterError::unknown(stderr.trim().to_owned())
        }
    }
}

#[async_trait]
impl MuxerAdapter for TmuxAdapter {
    async fn has_session(&self) -> Result<bool, AdapterError> {
        let out = self.run(&["has-session", "-t", &self.session]).await?;
        Ok(out.status.success())
    }

    async fn list_windows(&self) -> Result<Vec<String>, AdapterError> {
        let out = self
            .run(&["list-windows", "-t", &self.session, "-F", "#{window_name}"])
            .await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(String::from_utf8_lossy(&out.stdout).lines().map(str::to_owned).collect())
    }

    async fn new_window(&self, name: &str, working_dir: &str) -> Result<(), AdapterError> {
        let target = format!("{}:", self.session);
        let out = self
            .run(&["new-window", "-d", "-n", name, "-t", &target, "-c", working_dir])
            .await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    async fn kill_window(&self, name: &str) -> Result<(), AdapterError> {
        let target = self.target(name);
        let out = self.run(&["kill-window", "-t", &target]).await?;
        if out.status.success() {
            return Ok(());
        }
        match Self::classify_failure(&String::from_utf8_lossy(&out.stderr)) {
            AdapterError { code: crate::error::ErrorCode::NotFound, .. } => Ok(()),
            other => Err(other),
        }
    }

    async fn rename_window(&self, from: &str, to: &str) -> Result<(), AdapterError> {
        let target = self.target(from);
        let out = self.run(&["rename-window", "-t", &target, to]).await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    async fn capture_pane(&self, window: &str) -> Result<String, AdapterError> {
        let target = self.target(window);
        let out = self.run(&["capture-pane", "-p", "-t", &target]).await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    async fn send_keys_literal(&self, window: &str, text: &str) -> Result<(), AdapterError> {
        let target = self.target(window);
        let out = self.run(&["send-keys", "-l", "-t", &target, text]).await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    async fn send_key_named(&self, window: &str, key: &str) -> Result<(), AdapterError> {
        let target = self.target(window);
        let out = self.run(&["send-keys", "-t", &target, key]).await?;
        if !out.status.success() {
            return Err(Self::classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "muxer_tests.rs"]
mod tests;
