//! The Bot Command Handler (SPEC_FULL.md §4.7) — a closed grammar of
//! administrative commands, each producing a single chat reply.

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{Session, Status};

/// A parsed command, with its argument where applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sessions,
    Status,
    Kill { window: String },
    Find { query: String },
    Help,
}

/// Parse a `!...`-prefixed message or a slash-command name + text into a
/// [`Command`]. Slash-command variants share identical semantics with their
/// `!`-prefixed counterparts (SPEC_FULL.md §4.7).
pub fn parse(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('!').or_else(|| trimmed.strip_prefix('/'))?;
    let (word, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    let rest = rest.trim();

    match word {
        "sessions" | "s" => Some(Command::Sessions),
        "status" => Some(Command::Status),
        "kill" if !rest.is_empty() => Some(Command::Kill { window: rest.to_owned() }),
        "find" | "f" if !rest.is_empty() => Some(Command::Find { query: sanitize_query(rest) }),
        "help" | "h" => Some(Command::Help),
        _ => None,
    }
}

static UNSAFE_CHAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

fn sanitize_query(query: &str) -> String {
    UNSAFE_CHAR.replace_all(query, "").into_owned()
}

fn status_emoji(status: Status) -> &'static str {
    match status {
        Status::Starting => "🟡",
        Status::Active => "🟢",
        Status::Idle => "💤",
        Status::Terminated => "⚫",
    }
}

/// Build a thread permalink from the workspace URL learned at startup via
/// `auth.test` (SPEC_FULL.md §6). Falls back to a bare channel mention if
/// the workspace URL is unknown (lookup failed, or a test harness with no
/// real chat backend).
fn thread_link(workspace_url: &str, session: &Session) -> String {
    if workspace_url.is_empty() {
        return format!("<#{}>", session.thread_id);
    }
    let ts_no_dot: String = session.thread_id.chars().filter(|c| *c != '.').collect();
    format!("{}/archives/{}/p{}", workspace_url.trim_end_matches('/'), session.channel_id, ts_no_dot)
}

/// Render the `!sessions`/`!s` reply body (SPEC_FULL.md §4.7): one line per
/// non-`terminated` Session.
pub fn render_sessions(sessions: &[Session], now: u64, workspace_url: &str) -> String {
    let active: Vec<&Session> = sessions.iter().filter(|s| !s.status.is_terminated()).collect();
    if active.is_empty() {
        return "No active sessions.".to_owned();
    }
    active
        .iter()
        .map(|s| {
            let idle = s.idle_since.map(|since| format!(" (idle {}s)", now.saturating_sub(since))).unwrap_or_default();
            format!("{} {}{} {} `{}`", status_emoji(s.status), s.working_dir, idle, thread_link(workspace_url, s), s.window)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct StatusSummary {
    pub muxer_alive: bool,
    pub counts_by_status: Vec<(Status, usize)>,
    pub idle_timeout_minutes: u64,
}

pub fn render_status(summary: &StatusSummary) -> String {
    let counts = summary
        .counts_by_status
        .iter()
        .map(|(status, n)| format!("{status:?}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "muxer: {}\n{}\nidle timeout: {}m",
        if summary.muxer_alive { "alive" } else { "unreachable" },
        counts,
        summary.idle_timeout_minutes
    )
}

pub const HELP_TEXT: &str = "\
Commands:
  !sessions / !s       list active sessions
  !status              bridge status
  !kill <window>       terminate a session
  !find <q> / !f <q>   search for a working directory under $HOME
  !help / !h           this message";

/// A single `!find`/`!f` result: a directory path, annotated with its git
/// branch if it's a git working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindResult {
    pub path: String,
    pub git_branch: Option<String>,
}

pub fn render_find_results(results: &[FindResult]) -> String {
    if results.is_empty() {
        return "No matching directories found.".to_owned();
    }
    results
        .iter()
        .map(|r| match &r.git_branch {
            Some(branch) => format!("{} ({branch})", r.path),
            None => r.path.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const FIND_MAX_DEPTH: usize = 4;
const FIND_MAX_RESULTS: usize = 10;

/// Search for directories matching `query` under `home`, up to
/// [`FIND_MAX_DEPTH`] deep, capped at [`FIND_MAX_RESULTS`] (SPEC_FULL.md
/// §4.7). `query` must already be sanitized via [`sanitize_query`]/[`parse`].
pub fn find_directories(home: &std::path::Path, query: &str) -> Vec<FindResult> {
    let needle = query.to_lowercase();
    walkdir::WalkDir::new(home)
        .max_depth(FIND_MAX_DEPTH)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .take(FIND_MAX_RESULTS)
        .map(|entry| FindResult { path: entry.path().display().to_string(), git_branch: git_branch_of(entry.path()) })
        .collect()
}

fn git_branch_of(dir: &std::path::Path) -> Option<String> {
    let head = std::fs::read_to_string(dir.join(".git").join("HEAD")).ok()?;
    head.trim().strip_prefix("ref: refs/heads/").map(str::to_owned)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
