use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chat_core::{load_settings, spawn_session, ApprovalController, ConversationLog, HttpBackend};
use clap::Parser;
use shared::domain::DryRunMode;
use tokio::io::BufReader;
use tracing::info;

mod commands;
mod render;
mod repl;

#[derive(Parser, Debug)]
#[command(name = "kubechat", about = "Talk to your cluster; every command waits for approval")]
struct Args {
    /// Overrides `backend_url` from the config file and environment.
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// `local` synthesizes dry-run output; `remote` asks the backend to validate.
    #[arg(long)]
    dry_run_mode: Option<DryRunMode>,
    #[arg(long)]
    no_greeting: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    if let Some(mode) = args.dry_run_mode {
        settings.dry_run_mode = mode;
    }
    if args.no_greeting {
        settings.greeting = None;
    }
    settings.validate().context("invalid console settings")?;

    let backend = Arc::new(HttpBackend::from_settings(&settings)?);
    let log = match &settings.greeting {
        Some(greeting) => ConversationLog::with_greeting(greeting.as_str()),
        None => ConversationLog::new(),
    };
    let controller = ApprovalController::new(settings.vocabulary(), settings.dry_run_mode);
    let (session, worker) = spawn_session(controller, log, backend.clone(), backend);
    info!(backend = %settings.backend_url, dry_run_mode = ?settings.dry_run_mode, "console ready");

    let mut events = session.subscribe();
    let mut stdout = std::io::stdout();
    repl::print_history(&session, &mut stdout).await?;
    repl::run(
        &session,
        &mut events,
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
    )
    .await?;

    let log = repl::close(session, worker).await?;
    info!(messages = log.len(), "console closed");
    Ok(())
}
