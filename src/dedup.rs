//! The Duplicate Suppressor (SPEC_FULL.md §4.6) — one pending-hash file per
//! thread, read by the external prompt-forwarding hook to suppress echo of
//! chat-originated input. The wire format (md5 of trimmed text) is fixed by
//! that hook's existing contract, not a choice made here.

use crate::paths::pending_hash_path;

/// `md5(trim(text))`, hex-encoded — the exact value the pending-hash file
/// holds (SPEC_FULL.md §4.3.3 step 3, §4.6).
pub fn hash(text: &str) -> String {
    format!("{:x}", md5::compute(text.trim()))
}

/// Write the pending-hash file for `thread_id`, overwriting any prior value.
/// Called immediately before injecting text into the window (§4.3.3 step 3)
/// and once per attachment (§4.3.3 step 1, keyed on the trimmed path).
pub fn mark_pending(thread_id: &str, text: &str) -> std::io::Result<()> {
    std::fs::write(pending_hash_path(thread_id), hash(text))
}

/// Remove the pending-hash file for `thread_id`, if any. Both sides may
/// delete it (§5 shared-resource policy), so a missing file is not an error.
pub fn clear_pending(thread_id: &str) -> std::io::Result<()> {
    match std::fs::remove_file(pending_hash_path(thread_id)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
