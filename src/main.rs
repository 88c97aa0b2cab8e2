//! Synth editor backend.
//!
//! Routes parameter-change work between the MIDI device, the editor worker,
//! and the UI, with exactly one unit of editor work in flight at a time.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod console;
mod editor;
mod midi;
mod paths;
mod queue;
mod router;
mod supervisor;
mod ui;

use crate::config::ConfigStore;
use crate::paths::AppPaths;
use crate::supervisor::Supervisor;
use crate::ui::UiEvent;

/// Synth editor backend - connect a hardware synth editor to its device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: auto-detected)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Run the interactive console instead of headless mode
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        midi::worker::print_ports();
        return Ok(());
    }

    let config_path = match args.config {
        Some(path) => path,
        None => {
            let paths = AppPaths::detect();
            if paths.is_dev {
                debug!("Using working-directory config");
            }
            paths.config
        }
    };

    let store = ConfigStore::new(config_path);
    info!("Configuration file: {}", store.path().display());
    let (supervisor, ui_rx) = Supervisor::start(store);

    if args.console {
        console::run(supervisor.router(), ui_rx).await?;
    } else {
        run_headless(ui_rx).await;
    }

    supervisor.shutdown().await;
    info!("Synth editor shutdown complete");
    Ok(())
}

/// Headless mode: log UI events until a shutdown signal arrives.
async fn run_headless(mut ui_rx: ui::UiEventReceiver) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = ui_rx.recv() => match event {
                UiEvent::Devices(devices) => info!(%devices, "Devices"),
                UiEvent::Status(text) => info!("{text}"),
                UiEvent::Redraw => debug!("Redraw requested"),
            },
            _ = &mut shutdown => break,
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
