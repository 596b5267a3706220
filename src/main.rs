use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatmux_bridge::chat::SlackChatClient;
use chatmux_bridge::config::{Cli, Subcommand};
use chatmux_bridge::instance_lock::{self, InstanceLock};
use chatmux_bridge::muxer::TmuxAdapter;
use chatmux_bridge::registry::RegistryStore;
use chatmux_bridge::server::AppState;
use chatmux_bridge::session::SessionManager;
use chatmux_bridge::{config, fetcher, paths, run, timing};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        error!("failed to install rustls crypto provider: {e:?}");
        std::process::exit(1);
    }

    if let Err(e) = try_main(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn try_main(cli: Cli) -> anyhow::Result<()> {
    let settings = config::Settings::load(&cli.config)?;

    if let Some(Subcommand::RegistryDump) = cli.subcommand {
        let registry = RegistryStore::at_default_location()?;
        let dump = registry.load();
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    let token_hash = instance_lock::token_hash_prefix(&settings.bot_token);
    let lock_path = paths::instance_lock_path(&token_hash);
    let _instance_lock = InstanceLock::acquire(lock_path)?;

    let timing = timing::Timing::default();
    let registry = RegistryStore::at_default_location()?;
    let muxer = Arc::new(TmuxAdapter::new(settings.multi_session.tmux_session.clone()));
    let chat = Arc::new(SlackChatClient::new(settings.bot_token.clone())?);
    let fetch_root = paths::fetch_root();
    let fetcher = fetcher::FileFetcher::new(fetch_root.clone(), settings.bot_token.clone(), &timing)?;

    let sessions = SessionManager::new(registry, muxer.clone(), chat.clone(), settings.clone(), timing).await;
    sessions.reconcile_at_startup().await?;

    let workspace_url = match chat.auth_test().await {
        Ok(info) => info.url,
        Err(e) => {
            warn!(error = %e, "auth.test failed, thread links will fall back to channel mentions");
            String::new()
        }
    };

    let state = Arc::new(AppState { sessions, chat, fetcher, settings: settings.clone(), workspace_url });
    let shutdown = CancellationToken::new();

    let sweeps = tokio::spawn(run::run_sweeps(
        state.clone(),
        shutdown.clone(),
        fetch_root,
        settings.multi_session.temp_file_retention_days,
    ));

    let router = chatmux_bridge::server::build_router(state);
    // Bind address/port aren't part of the chat-facing settings schema; the
    // bridge sits behind a reverse proxy that terminates TLS for the event
    // subscription URL, so a fixed local port is fine.
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
    info!("chatmux-bridge listening on {}", listener.local_addr()?);

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            serve_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = sweeps.await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
