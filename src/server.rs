//! `axum` HTTP server wiring for inbound chat events (SPEC_FULL.md §6):
//! one `Router::new()` with routes, a `TraceLayer`, and `with_state`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::chat::{ChatClient, InboundEvent};
use crate::config::Settings;
use crate::fetcher::FileFetcher;
use crate::session::SessionManager;

pub struct AppState {
    pub sessions: SessionManager,
    pub chat: Arc<dyn ChatClient>,
    pub fetcher: FileFetcher,
    pub settings: Settings,
    /// Workspace URL learned once from `auth.test` at startup, used to build
    /// thread links in `!sessions` output (SPEC_FULL.md §6). Empty if the
    /// lookup failed or hasn't run (tests).
    pub workspace_url: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/slack/events", post(slack_events))
        .route("/slack/commands", post(slack_commands))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Handles both the one-time URL verification challenge and ongoing event
/// payloads (SPEC_FULL.md §6: `message`, `app_mention`, `reaction_added`).
async fn slack_events(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> impl IntoResponse {
    if let Some(challenge) = body.get("challenge").and_then(|v| v.as_str()) {
        return challenge.to_owned();
    }

    let Some(event) = body.get("event").cloned() else {
        return String::new();
    };
    match serde_json::from_value::<InboundEvent>(event) {
        Ok(event) => {
            if let Err(e) = crate::run::handle_inbound_event(&state, event).await {
                tracing::error!(error = %e, "failed to handle inbound chat event");
            }
        }
        Err(e) => tracing::debug!(error = %e, "ignoring unrecognized chat event shape"),
    }
    String::new()
}

async fn slack_commands(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let form: std::collections::HashMap<String, String> =
        url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
    let user_id = form.get("user_id").cloned().unwrap_or_default();
    let channel_id = form.get("channel_id").cloned().unwrap_or_default();
    let command = form.get("command").cloned().unwrap_or_default();
    let text = form.get("text").cloned().unwrap_or_default();

    let reply = crate::run::handle_slash_command(&state, &user_id, &channel_id, &command, &text).await;
    Json(serde_json::json!({ "response_type": "ephemeral", "text": reply }))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
