use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trip_hub::api;
use trip_hub::config::{Cli, Commands, ServeArgs};
use trip_hub::{patch, seed};
use trip_hub_core::{DocumentStore, TripService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => run_server(args).await?,
        Commands::Seed(args) => {
            seed::seed_tenant(&args)?;
        }
        Commands::Patch(args) => patch::run(args).await?,
    }
    Ok(())
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let store = Arc::new(DocumentStore::open(&args.data_dir)?);
    let app = api::router(TripService::new(store));

    let listener = TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, data_dir = %args.data_dir.display(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
