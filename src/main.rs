//! wdeploy: configure and deploy Webitel from the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod editor;
mod events;
mod layout;
mod pages;
mod runner;
mod shortcuts;
mod tail;
mod templates;
mod ui;
mod widgets;

use cli::{Cli, Commands};
use config::{DeployConfig, LogFormat, LogSettings, Settings};

const LOG_FILE: &str = "wdeploy.log";

/// File logging; the terminal belongs to the UI. The guard must outlive the app.
fn init_logging(log: &LogSettings) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&log.directory)
        .with_context(|| format!("failed to create {}", log.directory.display()))?;
    let file_appender = tracing_appender::rolling::never(&log.directory, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.level.directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);
    let result = match log.format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log.directory.join(LOG_FILE).display());
    Ok(guard)
}

async fn run(settings: Settings) -> Result<()> {
    let _log_guard = init_logging(&settings.log)?;
    tracing::info!("wdeploy {} starting", env!("CARGO_PKG_VERSION"));

    // Configuration problems are fatal before the terminal is taken over.
    let shortcuts = shortcuts::Shortcuts::load_or_default(&settings.shortcuts_file)?;
    let cfg = DeployConfig::load(settings).context("failed to load configuration")?;
    let app = app::App::new(cfg, shortcuts, editor::EditorCommand::from_env());

    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal, app).await;
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("wdeploy exiting");
    res
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args.into()).await,
        Commands::Man => {
            println!("{}", cli::reference_doc());
            Ok(())
        }
    }
}
