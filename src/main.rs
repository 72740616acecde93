//! Activity scrubber.
//!
//! Attaches to Chrome over the DevTools Protocol, drives the activity-log
//! tab and serves the control API.

mod cli;
mod cmd_run;
mod cmd_state;

use clap::Parser;
use scrubber_config::scrubber_home;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

/// Console plus daily-rolling file logging under `~/.scrubber/logs`.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = scrubber_home().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("scrubber")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // dropping the guard stops file output
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let config_path = cli.config_path();

    match cli.command.unwrap_or_default() {
        Commands::Run {
            no_auto_start,
            host,
            port,
        } => cmd_run::run(&config_path, !no_auto_start, host, port).await,
        Commands::Status { json } => cmd_state::status(&config_path, json).await,
        Commands::Reset => cmd_state::reset(&config_path).await,
        Commands::CheckConfig => cmd_state::check_config(&config_path),
    }
}
