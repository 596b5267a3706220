//! The Inbound Router (SPEC_FULL.md §4.4) — thread identification,
//! authorization, working-directory prefix parsing, in-session directives,
//! and the reaction table.

use regex::Regex;
use std::sync::LazyLock;

/// Resolve the `threadId` an inbound message belongs to: the parent of a
/// thread reply, or the message's own id if it starts a new thread.
pub fn thread_id_for(message_id: &str, parent_message_id: Option<&str>) -> String {
    parent_message_id.unwrap_or(message_id).to_owned()
}

pub fn is_authorized(user_id: &str, allowed_users: &[String]) -> bool {
    allowed_users.iter().any(|u| u == user_id)
}

static WORKING_DIR_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s*(.*)$").unwrap());

/// Strip a leading `[<path>]` from a new-thread message, resolving `~`
/// against `$HOME`. Returns `(working_dir, remaining_text)`; `working_dir`
/// is `None` if the message carried no prefix, or if the prefix's path
/// doesn't resolve to an existing directory (SPEC_FULL.md §4.4).
pub fn strip_working_dir_prefix(text: &str, home: &str) -> (Option<String>, String) {
    let Some(caps) = WORKING_DIR_PREFIX.captures(text) else {
        return (None, text.to_owned());
    };
    let raw_path = &caps[1];
    let rest = caps[2].to_owned();

    let resolved = if let Some(stripped) = raw_path.strip_prefix('~') {
        format!("{home}{stripped}")
    } else {
        raw_path.to_owned()
    };

    if std::path::Path::new(&resolved).is_dir() {
        (Some(resolved), rest)
    } else {
        (None, rest)
    }
}

/// In-session directives that bypass normal forwarding (SPEC_FULL.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Kill,
    Status,
}

/// Classify an in-session message as a directive, if it's exactly one of
/// the recognized literals. All other `!...` text is forwarded as a normal
/// message.
pub fn classify_directive(text: &str) -> Option<Directive> {
    match text.trim() {
        "!kill" => Some(Directive::Kill),
        "!status" => Some(Directive::Status),
        _ => None,
    }
}

/// The effect a reaction on a thread's root message has (SPEC_FULL.md §4.4
/// reaction table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEffect {
    Terminate,
    Approve,
    Reject,
}

pub fn reaction_effect(name: &str) -> Option<ReactionEffect> {
    match name {
        "octagonal_sign" | "stop_sign" | "no_entry" => Some(ReactionEffect::Terminate),
        "white_check_mark" | "heavy_check_mark" => Some(ReactionEffect::Approve),
        "x" | "negative_squared_cross_mark" => Some(ReactionEffect::Reject),
        _ => None,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
