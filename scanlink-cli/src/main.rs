use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use scanlink_server::{AppState, ServerConfig, SignalingService, router, spawn_relay};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanlink", version, about = "Signaling relay for scan sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Seconds between registry sweeps.
        #[arg(long, default_value_t = 120)]
        sweep_interval: u64,

        /// Seconds without a heartbeat before a participant is abandoned.
        #[arg(long, default_value_t = 300)]
        stale_after: u64,

        /// Seconds an empty room may linger before the sweep purges it.
        #[arg(long, default_value_t = 3600)]
        empty_room_after: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Serve {
            bind,
            sweep_interval,
            stale_after,
            empty_room_after,
        } => {
            let config = ServerConfig {
                sweep_interval: Duration::from_secs(sweep_interval),
                stale_participant_after: Duration::from_secs(stale_after),
                empty_room_after: Duration::from_secs(empty_room_after),
                ..ServerConfig::default()
            };

            let signaling = SignalingService::new();
            let relay = spawn_relay(config, Arc::new(signaling.clone()));
            let state = AppState { signaling, relay };

            // Origin policy lives outside the core; the relay itself
            // never inspects origins.
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);

            let app = router(state).layer(cors);

            println!("{}", "scanlink signaling relay".green().bold());
            info!("listening on http://{bind}");

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            axum::serve(listener, app).await.context("server exited")?;
        }
    }

    Ok(())
}
