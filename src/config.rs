//! Process bootstrap configuration and the JSON settings file it loads.
//!
//! Two-tier layering: a handful of `clap`-derived process flags
//! (env-overridable) for bootstrap knobs, plus a `serde` settings file for
//! the chat-facing contract (SPEC_FULL.md §6).

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Process-level bootstrap flags.
#[derive(Debug, Parser)]
#[command(name = "chatmux-bridge", version, about = "Chat-to-muxer assistant bridge.")]
pub struct Cli {
    /// Path to the bridge JSON settings file.
    #[arg(long, env = "BRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "BRIDGE_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    #[command(subcommand)]
    pub subcommand: Option<Subcommand>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Load and pretty-print the registry without starting the event loop.
    RegistryDump,
}

/// The `multiSession` block of the settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSession {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default = "default_idle_timeout_minutes")]
    pub idle_timeout_minutes: u64,
    #[serde(default = "default_tmux_session")]
    pub tmux_session: String,
    #[serde(default = "default_working_dir")]
    pub default_working_dir: String,
    #[serde(default)]
    pub notify_on_timeout: bool,
    #[serde(default = "default_retention_days")]
    pub temp_file_retention_days: u64,
}

fn default_max_concurrent() -> u32 {
    5
}
fn default_idle_timeout_minutes() -> u64 {
    60
}
fn default_tmux_session() -> String {
    "claude".to_owned()
}
fn default_working_dir() -> String {
    "~".to_owned()
}
fn default_retention_days() -> u64 {
    14
}

impl Default for MultiSession {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            idle_timeout_minutes: default_idle_timeout_minutes(),
            tmux_session: default_tmux_session(),
            default_working_dir: default_working_dir(),
            notify_on_timeout: false,
            temp_file_retention_days: default_retention_days(),
        }
    }
}

/// The chat-facing settings file, loaded from the path named by `--config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub bot_token: String,
    pub app_token: String,
    #[serde(default)]
    pub allowed_users: Vec<String>,
    pub notify_channel: String,
    #[serde(default)]
    pub multi_session: MultiSession,
}

impl Settings {
    /// Load settings from a JSON file on disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {path:?}: {e}"))?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parsing config file {path:?}: {e}"))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field invariants the schema alone can't express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bot_token.is_empty() {
            anyhow::bail!("botToken must not be empty");
        }
        if self.app_token.is_empty() {
            anyhow::bail!("appToken must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
