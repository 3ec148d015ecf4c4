use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use feednotion_core::{config::GeneralConfig, scheduler::JobRunner, AppConfig};

mod logging;

/// Settings come from the environment or a `.env` file
#[derive(Parser)]
#[command(name = "feednotion")]
#[command(author, version, about = "Summarize RSS articles with Gemini and store them in Notion")]
struct Cli {}

/// Resolve when a signal listener fires; a listener that failed to install never resolves
async fn signal_received(result: std::io::Result<()>, name: &str) {
    if let Err(e) = result {
        error!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

/// Wait for Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async { signal_received(tokio::signal::ctrl_c().await, "Ctrl+C").await };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    }

    ctrl_c.await;
}

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse();

    logging::init(&GeneralConfig::load())?;
    info!("Main application started");

    let config = match AppConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Startup aborted: {}", e);
            return Err(e.into());
        }
    };

    let runner = JobRunner::from_config(config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    info!("Starting the scheduler loop. Press Ctrl+C to exit.");
    runner.run(shutdown_rx).await;

    Ok(())
}
