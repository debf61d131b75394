//! Logging setup for chatdeck using tracing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::console::{OutputRouter, RouterWriter};

/// Initialize logging with a file appender and console output.
///
/// Console output goes through `router`, so warnings printed while the
/// interactive console is attached do not break the prompt.
pub fn init(router: Arc<OutputRouter>) -> Result<(WorkerGuard, PathBuf)> {
    // Get the log directory
    let log_dir = get_log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    // Create file appender with rotation
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chatdeck.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Build the subscriber
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chatdeck=debug"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(RouterWriter::new(router))
        .with_ansi(true)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("chatdeck logging initialized");
    tracing::info!("Log directory: {}", log_dir.display());

    Ok((guard, log_dir))
}

/// Get the log directory path.
fn get_log_dir() -> Result<PathBuf> {
    let home = directories::ProjectDirs::from("com", "chatdeck", "chatdeck")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    Ok(home.data_dir().join("logs"))
}
