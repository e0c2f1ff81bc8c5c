use crate::services::catalog::CatalogService;
use crate::services::sync_journal::SyncKind;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Runs a full sync on a fixed interval until shutdown is signalled.
pub struct SyncWorker {
    catalog: CatalogService,
    interval: Duration,
    sync_on_start: bool,
    shutdown: watch::Receiver<bool>,
}

impl SyncWorker {
    pub fn new(
        catalog: CatalogService,
        interval_secs: u64,
        sync_on_start: bool,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            catalog,
            interval: Duration::from_secs(interval_secs.max(1)),
            sync_on_start,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Sync worker started (every {}s)",
            self.interval.as_secs()
        );

        match self.catalog.journal().last_completed(SyncKind::Full).await {
            Ok(Some(run)) => tracing::info!("Last completed full sync started at {}", run.started_at),
            Ok(None) => tracing::info!("No completed full sync on record"),
            Err(e) => tracing::warn!("Could not read sync journal: {}", e),
        }

        if self.sync_on_start {
            self.perform_sync().await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Sync worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_sync().await;
                }
            }
        }
    }

    async fn perform_sync(&self) {
        tracing::info!("🔁 Running scheduled full sync...");

        // Failures are journaled by the catalog service; the next tick retries.
        match self.catalog.run_full_sync().await {
            Ok(stats) if stats.has_changes() => {
                tracing::info!("✅ Scheduled sync applied changes: {:?}", stats)
            }
            Ok(_) => tracing::info!("✅ Scheduled sync found nothing to change"),
            Err(e) => tracing::error!("Scheduled sync failed: {}", e),
        }
    }
}
