//! The chat transport is out of scope beyond a thin interface (SPEC_FULL.md
//! §1, §6): [`ChatClient`] names the operations the core needs, and
//! [`SlackChatClient`] is the one concrete `reqwest`-backed implementation
//! against a Slack-shaped Web API.

use async_trait::async_trait;
use serde::Deserialize;

/// Destination for a posted message: a channel, optionally within a thread.
#[derive(Debug, Clone)]
pub struct Destination {
    pub channel_id: String,
    pub thread_id: Option<String>,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(&self, dest: &Destination, text: &str) -> anyhow::Result<String>;
    async fn add_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()>;
    async fn remove_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()>;
    /// Learn the workspace's own identity/URL once at startup, for building
    /// thread links (SPEC_FULL.md §6).
    async fn auth_test(&self) -> anyhow::Result<AuthInfo>;
    /// Resolve a DM user id to a private channel id, used when removing
    /// reactions on a DM thread (SPEC_FULL.md §6 reaction vocabulary note).
    async fn conversations_open(&self, user_id: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthInfo {
    pub url: String,
    pub user_id: String,
}

pub struct SlackChatClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl SlackChatClient {
    pub fn new(bot_token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;
        Ok(Self { http, bot_token: bot_token.into(), base_url: "https://slack.com/api".to_owned() })
    }

    #[cfg(test)]
    pub fn with_base_url(bot_token: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;
        Ok(Self { http, bot_token: bot_token.into(), base_url: base_url.into() })
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}/{method}", self.base_url);
        let resp: serde_json::Value = self
            .http
            .post(url)
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if resp.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = resp.get("error").and_then(|v| v.as_str()).unwrap_or("unknown_error");
            anyhow::bail!("slack API {method} failed: {error}");
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatClient for SlackChatClient {
    async fn post_message(&self, dest: &Destination, text: &str) -> anyhow::Result<String> {
        let mut body = serde_json::json!({ "channel": dest.channel_id, "text": text });
        if let Some(thread_id) = &dest.thread_id {
            body["thread_ts"] = serde_json::Value::String(thread_id.clone());
        }
        let resp = self.call("chat.postMessage", body).await?;
        resp.get("ts")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("chat.postMessage response missing ts"))
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()> {
        self.call(
            "reactions.add",
            serde_json::json!({ "channel": channel_id, "timestamp": message_id, "name": name }),
        )
        .await?;
        Ok(())
    }

    async fn remove_reaction(&self, channel_id: &str, message_id: &str, name: &str) -> anyhow::Result<()> {
        self.call(
            "reactions.remove",
            serde_json::json!({ "channel": channel_id, "timestamp": message_id, "name": name }),
        )
        .await?;
        Ok(())
    }

    async fn auth_test(&self) -> anyhow::Result<AuthInfo> {
        let resp = self.call("auth.test", serde_json::json!({})).await?;
        Ok(AuthInfo {
            url: resp.get("url").and_then(|v| v.as_str()).unwrap_or_default().to_owned(),
            user_id: resp.get("user_id").and_then(|v| v.as_str()).unwrap_or_default().to_owned(),
        })
    }

    async fn conversations_open(&self, user_id: &str) -> anyhow::Result<String> {
        let resp = self.call("conversations.open", serde_json::json!({ "users": user_id })).await?;
        resp.get("channel")
            .and_then(|c| c.get("id"))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("conversations.open response missing channel.id"))
    }
}

/// Inbound event shapes the Inbound Router dispatches on (SPEC_FULL.md §4.4,
/// §6). Deliberately narrow: only the fields the core actually reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(MessageEvent),
    AppMention(MessageEvent),
    ReactionAdded(ReactionEvent),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub channel: String,
    pub user: String,
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub files: Vec<AttachmentRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
    pub url_private: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionEvent {
    pub user: String,
    pub reaction: String,
    pub item_user: String,
    pub item: ReactionItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionItem {
    pub channel: String,
    pub ts: String,
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
