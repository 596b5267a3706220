//! Top-level orchestration: wires the components built from [`Settings`]
//! together, dispatches inbound chat events/commands, and spawns the three
//! periodic sweeps (SPEC_FULL.md §4.3.5) behind a `CancellationToken`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chat::{Destination, InboundEvent, MessageEvent, ReactionEvent};
use crate::commands::{self, Command};
use crate::model::Status;
use crate::router::{self, Directive, ReactionEffect};
use crate::server::AppState;

const NOT_AUTHORIZED: &str = "Sorry, you're not authorized to use this bridge.";

/// Dispatch a single inbound chat event through the Inbound Router to
/// either the Session Manager or the Bot Command Handler (SPEC_FULL.md
/// §4.4).
pub async fn handle_inbound_event(state: &Arc<AppState>, event: InboundEvent) -> anyhow::Result<()> {
    match event {
        InboundEvent::Message(msg) | InboundEvent::AppMention(msg) => handle_message(state, msg).await,
        InboundEvent::ReactionAdded(reaction) => handle_reaction(state, reaction).await,
    }
}

async fn handle_message(state: &Arc<AppState>, msg: MessageEvent) -> anyhow::Result<()> {
    // Bot's own messages and any other subtyped event (edits, joins, thread
    // broadcasts, ...) are ignored; a plain message has no subtype, and
    // `file_share` is the one subtype that still needs normal processing
    // (SPEC_FULL.md §4.4).
    if let Some(subtype) = msg.subtype.as_deref() {
        if subtype != "file_share" {
            return Ok(());
        }
    }

    if !router::is_authorized(&msg.user, &state.settings.allowed_users) {
        let dest = Destination { channel_id: msg.channel.clone(), thread_id: msg.thread_ts.clone() };
        state.chat.post_message(&dest, NOT_AUTHORIZED).await?;
        return Ok(());
    }

    let thread_id = router::thread_id_for(&msg.ts, msg.thread_ts.as_deref());

    if let Some(command) = commands::parse(&msg.text) {
        let reply = run_command(state, command).await;
        let dest = Destination { channel_id: msg.channel.clone(), thread_id: Some(thread_id) };
        state.chat.post_message(&dest, &reply).await?;
        return Ok(());
    }

    if let Some(session) = state.sessions.registry_get(&thread_id).filter(|s| !s.status.is_terminated()) {
        if let Some(directive) = router::classify_directive(&msg.text) {
            return handle_directive(state, &thread_id, directive, &session).await;
        }
        return inject_message(state, &session, &msg).await;
    }

    let (working_dir, text) = if msg.thread_ts.is_none() {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_owned());
        router::strip_working_dir_prefix(&msg.text, &home)
    } else {
        (None, msg.text.clone())
    };

    let session = state.sessions.ensure_session(&thread_id, &msg.channel, working_dir.as_deref()).await?;

    if session.status == Status::Starting && session.assistant_id.is_none() {
        let state = state.clone();
        let window = session.window.clone();
        tokio::spawn(async move {
            if let Err(e) = state.sessions.confirm_trust_dialog(&window).await {
                warn!(error = %e, window, "trust dialog confirmation failed");
            }
        });
    }
    state.sessions.wait_until_ready(&session.window).await;

    let mut msg = msg;
    msg.text = text;
    inject_message(state, &session, &msg).await
}

async fn inject_message(state: &Arc<AppState>, session: &crate::model::Session, msg: &MessageEvent) -> anyhow::Result<()> {
    let mut attachments = Vec::new();
    let mut unsupported = Vec::new();
    for file in &msg.files {
        match state.fetcher.fetch(&session.thread_id, &file.name, &file.url_private).await {
            Ok(path) => attachments.push(path),
            Err(crate::fetcher::FetchError::Unsupported(_)) => unsupported.push(file.name.clone()),
            Err(e) => warn!(error = %e, file = %file.name, "attachment download failed"),
        }
    }
    let mut text = msg.text.clone();
    if !unsupported.is_empty() {
        text = format!("{text} [Unsupported file types: {}]", unsupported.join(", "));
    }
    state.sessions.inject(session, &text, &attachments, &msg.ts).await
}

async fn handle_directive(
    state: &Arc<AppState>,
    thread_id: &str,
    directive: Directive,
    session: &crate::model::Session,
) -> anyhow::Result<()> {
    match directive {
        Directive::Kill => state.sessions.terminate(thread_id, false).await,
        Directive::Status => {
            let dest = Destination { channel_id: session.channel_id.clone(), thread_id: Some(thread_id.to_owned()) };
            let text = format!("window `{}`, status {:?}", session.window, session.status);
            state.chat.post_message(&dest, &text).await?;
            Ok(())
        }
    }
}

async fn handle_reaction(state: &Arc<AppState>, reaction: ReactionEvent) -> anyhow::Result<()> {
    let Some(effect) = router::reaction_effect(&reaction.reaction) else { return Ok(()) };
    let Some(session) = state.sessions.registry_get(&reaction.item.ts) else { return Ok(()) };

    match effect {
        ReactionEffect::Terminate => {
            state.sessions.terminate(&session.thread_id, false).await?;
            let dest = Destination { channel_id: session.channel_id.clone(), thread_id: Some(session.thread_id.clone()) };
            state.chat.post_message(&dest, ":skull: Session terminated via reaction.").await?;
        }
        ReactionEffect::Approve => state.sessions.send(&session.window, "1").await?,
        ReactionEffect::Reject => state.sessions.send_key(&session.window, "escape").await?,
    }
    Ok(())
}

/// Run a parsed Bot Command Handler command to completion and render its
/// reply text (SPEC_FULL.md §4.7).
async fn run_command(state: &Arc<AppState>, command: Command) -> String {
    match command {
        Command::Sessions => {
            let sessions: Vec<_> = state.sessions.registry_load().into_values().collect();
            commands::render_sessions(&sessions, crate::model::now_epoch(), &state.workspace_url)
        }
        Command::Status => {
            let sessions = state.sessions.registry_load();
            let mut counts: BTreeMap<Status, usize> = BTreeMap::new();
            for s in sessions.values() {
                *counts.entry(s.status).or_insert(0) += 1;
            }
            commands::render_status(&commands::StatusSummary {
                muxer_alive: state.sessions.muxer_has_session().await,
                counts_by_status: counts.into_iter().collect(),
                idle_timeout_minutes: state.settings.multi_session.idle_timeout_minutes,
            })
        }
        Command::Kill { window } => {
            let sessions = state.sessions.registry_load();
            match sessions.values().find(|s| s.window == window) {
                Some(session) => {
                    let thread_id = session.thread_id.clone();
                    match state.sessions.terminate(&thread_id, false).await {
                        Ok(()) => format!("Terminated `{window}`."),
                        Err(e) => format!("Failed to terminate `{window}`: {e}"),
                    }
                }
                None => format!("No session with window `{window}`."),
            }
        }
        Command::Find { query } => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_owned());
            let results = commands::find_directories(std::path::Path::new(&home), &query);
            commands::render_find_results(&results)
        }
        Command::Help => commands::HELP_TEXT.to_owned(),
    }
}

/// Handle a slash-command invocation (SPEC_FULL.md §4.7: identical grammar
/// and semantics to the `!`-prefixed forms, replying in-place via the
/// slash-command's own ephemeral response instead of a normal post).
pub async fn handle_slash_command(state: &Arc<AppState>, user_id: &str, _channel_id: &str, command_name: &str, text: &str) -> String {
    if !router::is_authorized(user_id, &state.settings.allowed_users) {
        return NOT_AUTHORIZED.to_owned();
    }
    let full = format!("{command_name} {text}");
    match commands::parse(&full) {
        Some(command) => run_command(state, command).await,
        None => "Unrecognized command.".to_owned(),
    }
}

/// Spawn the three independent periodic sweeps (SPEC_FULL.md §4.3.5) and
/// run until `shutdown` is cancelled.
pub async fn run_sweeps(state: Arc<AppState>, shutdown: CancellationToken, fetch_root: std::path::PathBuf, retention_days: u64) {
    let timing = state.sessions.timing();

    let idle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timing.idle_sweep_interval) => {}
                    _ = shutdown.cancelled() => { info!("idle sweep shutting down"); return; }
                }
                if let Err(e) = state.sessions.sweep_idle().await {
                    warn!(error = %e, "idle sweep failed");
                }
            }
        }
    });

    let crash = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timing.crash_sweep_interval) => {}
                    _ = shutdown.cancelled() => { info!("crash sweep shutting down"); return; }
                }
                if let Err(e) = state.sessions.sweep_crashed().await {
                    warn!(error = %e, "crash sweep failed");
                }
            }
        }
    });

    let temp_cleanup = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            loop {
                if let Err(e) = crate::fetcher::sweep_old_fetches(
                    &fetch_root,
                    std::time::Duration::from_secs(retention_days * 24 * 60 * 60),
                    std::time::SystemTime::now(),
                ) {
                    warn!(error = %e, "temp cleanup sweep failed");
                }
                tokio::select! {
                    _ = tokio::time::sleep(timing.temp_cleanup_interval) => {}
                    _ = shutdown.cancelled() => { info!("temp cleanup sweep shutting down"); return; }
                }
            }
        }
    });

    let _ = tokio::join!(idle, crash, temp_cleanup);
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
