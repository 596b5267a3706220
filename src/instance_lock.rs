//! The Instance Lock (SPEC_FULL.md §4.8) — guarantees a single bridge
//! process writer per chat-app configuration (bot token). PID liveness is
//! checked via `nix::sys::signal::kill` with no signal delivered, just the
//! liveness probe `kill(2)` semantics give for free.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;
use sha2::{Digest, Sha256};

/// First 16 hex characters of the bot token's sha256 — enough to make the
/// lock file name unique per configuration without leaking the token.
pub fn token_hash_prefix(bot_token: &str) -> String {
    let digest = Sha256::digest(bot_token.as_bytes());
    format!("{digest:x}")[..16].to_owned()
}

pub struct InstanceLock {
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another bridge instance (pid {0}) already holds the lock")]
    AlreadyRunning(i32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstanceLock {
    /// Acquire the lock at `path`, created from a fixed known location keyed
    /// by the bot token's hash (see [`crate::paths::instance_lock_path`]).
    /// If a lock file exists and its PID is alive, refuse. If it exists and
    /// is stale (PID no longer alive), remove it and proceed.
    pub fn acquire(path: PathBuf) -> Result<Self, LockError> {
        if let Some(existing_pid) = read_live_pid(&path) {
            return Err(LockError::AlreadyRunning(existing_pid));
        }
        write_own_pid(&path)?;
        Ok(Self { path })
    }

    pub fn release(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_live_pid(path: &Path) -> Option<i32> {
    let contents = std::fs::read_to_string(path).ok()?;
    let pid: i32 = contents.trim().parse().ok()?;
    if pid_is_alive(pid) {
        Some(pid)
    } else {
        None
    }
}

fn pid_is_alive(pid: i32) -> bool {
    // `kill(pid, None)` sends no signal; its success/failure is the
    // standard liveness probe.
    kill(Pid::from_raw(pid), None).is_ok()
}

fn write_own_pid(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    write!(file, "{}", std::process::id())
}

#[cfg(test)]
#[path = "instance_lock_tests.rs"]
mod tests;
