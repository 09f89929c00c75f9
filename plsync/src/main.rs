use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use plsync_core::{
    bootstrap::load_config,
    client::{ChatClient, MatrixClient},
    config::SyncSettings,
    logging, SyncEngine, Syncer,
};

#[derive(Parser, Debug)]
#[command(name = "plsync")]
#[command(about = "Sync Discord bridge roles to Matrix power levels", long_about = None)]
struct Args {
    /// Path to the YAML config file
    #[arg(long, env = "PLSYNC_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("plsync starting...");

    let settings = SyncSettings::from_config(&config.sync)?;
    info!(
        tracked_rooms = settings.rooms.len(),
        server_name = %settings.server_name,
        allow_manual_resync = settings.allow_manual_resync,
        "Sync settings loaded"
    );

    // 3. Connect to the homeserver
    let client = Arc::new(MatrixClient::connect(&config.homeserver).await?);
    info!(user_id = %client.self_identity(), homeserver = %client.base_url(), "Connected");

    // 4. Wire the engine to the event feed
    let engine = Arc::new(SyncEngine::new(client.clone(), settings));
    let syncer = Syncer::new(client, engine, &config.sync);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        if shutdown_tx.send(true).is_err() {
            error!("Sync loop exited before shutdown");
        }
    });

    syncer.run(shutdown_rx).await;

    info!("plsync stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
