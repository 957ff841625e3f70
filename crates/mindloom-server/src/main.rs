//! Mindloom server binary: config, telemetry, workers, HTTP.

use anyhow::Result;
use clap::Parser;
use mindloom_core::AppCore;
use mindloom_core::config::Config;
use mindloom_core::http::HttpServer;
use mindloom_core::queue::JobExecutor;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mindloom", about = "Conversational backend with live mindmap construction")]
struct Args {
    /// Path of the embedded database file
    #[arg(long, env = "MINDLOOM_DB_PATH")]
    db_path: Option<String>,

    /// Host to bind the HTTP server to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the HTTP server to
    #[arg(long)]
    port: Option<u16>,

    /// Number of background job workers
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }

    let num_workers = config.num_workers;
    let core = Arc::new(AppCore::new(config)?);

    let executor = JobExecutor::new(core.clone(), num_workers);
    executor.start().await;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let server = HttpServer::new(core);
    server.run(shutdown_rx).await?;

    executor.stop().await;
    Ok(())
}
