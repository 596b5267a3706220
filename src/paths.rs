//! Well-known filesystem locations shared with out-of-process hook scripts
//! (SPEC_FULL.md §6). These are not part of the chat-facing config schema —
//! the hook contract fixes them, so they live as constants rather than
//! config fields.

use std::path::PathBuf;

const BRIDGE_PREFIX: &str = "chatmux-bridge";
const PENDING_PREFIX: &str = "chatmux-pending";
const DM_CACHE_PREFIX: &str = "chatmux-dm";

/// Directory holding `registry.json` and its companion lock file.
pub fn registry_dir() -> PathBuf {
    PathBuf::from("/tmp").join(format!("{BRIDGE_PREFIX}-registry"))
}

pub fn registry_path() -> PathBuf {
    registry_dir().join("registry.json")
}

pub fn registry_lock_path() -> PathBuf {
    registry_dir().join("registry.json.lock")
}

/// Pending-hash file a window's next injected text is recorded under, read
/// by the external prompt-forwarding hook (SPEC_FULL.md §4.6).
pub fn pending_hash_path(thread_id: &str) -> PathBuf {
    PathBuf::from("/tmp").join(format!("{PENDING_PREFIX}-{thread_id}"))
}

/// Cache file mapping a DM user id to its resolved private channel id
/// (SPEC_FULL.md §6, reaction vocabulary section).
pub fn dm_cache_path(user_id: &str) -> PathBuf {
    PathBuf::from("/tmp").join(format!("{DM_CACHE_PREFIX}-{user_id}"))
}

/// Instance lock file path for a given bot-token sha256 prefix
/// (SPEC_FULL.md §4.8).
pub fn instance_lock_path(token_hash_prefix: &str) -> PathBuf {
    PathBuf::from("/tmp").join(format!("{BRIDGE_PREFIX}-{token_hash_prefix}.lock"))
}

/// Root directory attachments are downloaded under, one subdirectory per
/// thread (SPEC_FULL.md §4.5).
pub fn fetch_root() -> PathBuf {
    PathBuf::from("/tmp").join(format!("{BRIDGE_PREFIX}-fetch"))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
