use catalog_sync::CatalogService;
use catalog_sync::config::CatalogConfig;
use catalog_sync::infrastructure::{database, storage};
use catalog_sync::services::worker::SyncWorker;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the whole bucket into the staged catalog
    Sync,
    /// Reconcile a single model folder
    SyncModel { folder: String },
    /// Promote a staged model (or "all") into the production catalog
    Activate { target: String },
    /// Run full syncs periodically until interrupted
    Worker,
    /// Show the most recent journaled runs
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting catalog sync [{:?}]...", args.command);

    // 2. Infrastructure
    let db = database::setup_database().await?;
    let storage_service = storage::setup_storage().await?;

    let config = CatalogConfig::from_env();
    info!(
        "⚙️  Catalog Config: page size={}, chunk size={}, signed URL TTL={}s",
        config.list_page_size, config.insert_chunk_size, config.signed_url_ttl_secs
    );

    let catalog = CatalogService::new(
        db,
        storage_service.clone(),
        storage_service,
        config.clone(),
    );

    // 3. Command
    match args.command {
        Command::Sync => print_json(&catalog.run_full_sync().await?)?,
        Command::SyncModel { folder } => print_json(&catalog.run_scoped_sync(&folder).await?)?,
        Command::Activate { target } => print_json(&catalog.activate(&target).await?)?,
        Command::History { limit } => print_json(&catalog.journal().recent(limit).await?)?,
        Command::Worker => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let worker = SyncWorker::new(
                catalog,
                config.sync_interval_secs,
                config.sync_on_start,
                shutdown_rx,
            );
            let handle = tokio::spawn(worker.run());
            info!("👷 Worker service initialized.");

            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
            let _ = handle.await;
        }
    }

    info!("👋 Catalog sync exited cleanly.");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
