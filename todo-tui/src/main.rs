use std::{fs::File, path::PathBuf, sync::Mutex};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::api::{ApiClient, ListFilter, TodoApi};
use crate::config::{Cli, Command};

mod api;
mod app;
mod config;
mod form;
mod ui;

/// The terminal belongs to the UI, so logs go to `<state dir>/todo/tui.log`.
fn init_logging() -> anyhow::Result<PathBuf> {
    let log_dir = dirs::state_dir()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .context("could not find a state directory for the log file")?
        .join("todo");
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("tui.log");
    let file = File::create(&log_path)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,todo_tui=info"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(env_filter),
        )
        .init();

    Ok(log_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging()?;

    let client = ApiClient::new(&cli.api_url, cli.timeout())?;
    tracing::info!(api = client.base_url(), log = %log_path.display(), "starting");

    match cli.command {
        Some(Command::Check) => {
            let todos = client
                .list_todos(&ListFilter::default())
                .await
                .with_context(|| format!("todo service at {} is not usable", client.base_url()))?;
            println!("ok: {} has {} todos", client.base_url(), todos.len());
        }
        None => ui::run_app(client).await?,
    }

    Ok(())
}
