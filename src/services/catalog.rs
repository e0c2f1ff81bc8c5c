use crate::config::CatalogConfig;
use crate::error::SyncResult;
use crate::models::{ActivationStats, ActivationTarget, SyncStats};
use crate::services::activation::ActivationService;
use crate::services::catalog_repository::CatalogRepository;
use crate::services::reconciliation::ReconciliationEngine;
use crate::services::storage::{StorageService, UrlSigner};
use crate::services::sync_journal::{SyncJournal, SyncKind};
use crate::utils::keyed_mutex::SyncLocks;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

/// Operations exposed to admin tooling. Every call is journaled; failures are
/// logged and returned unchanged so the caller can retry the whole run.
#[derive(Clone)]
pub struct CatalogService {
    engine: ReconciliationEngine,
    activation: Arc<ActivationService>,
    journal: SyncJournal,
}

impl CatalogService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        signer: Arc<dyn UrlSigner>,
        config: CatalogConfig,
    ) -> Self {
        let repo = CatalogRepository::new(db.clone(), config.insert_chunk_size);
        let engine =
            ReconciliationEngine::new(repo, storage.clone(), config.clone(), SyncLocks::new());
        let activation = Arc::new(ActivationService::new(
            engine.clone(),
            storage,
            signer,
            config,
        ));

        Self {
            engine,
            activation,
            journal: SyncJournal::new(db),
        }
    }

    pub fn journal(&self) -> &SyncJournal {
        &self.journal
    }

    pub async fn run_full_sync(&self) -> SyncResult<SyncStats> {
        self.journaled(SyncKind::Full, None, self.engine.run_full_sync())
            .await
    }

    pub async fn run_scoped_sync(&self, folder: &str) -> SyncResult<SyncStats> {
        self.journaled(
            SyncKind::Model,
            Some(folder),
            self.engine.run_scoped_sync(folder),
        )
        .await
    }

    /// `target` is a model folder or `"all"`
    pub async fn activate(&self, target: &str) -> SyncResult<ActivationStats> {
        let target = ActivationTarget::parse(target);
        let scope = match &target {
            ActivationTarget::All => "all",
            ActivationTarget::Model(folder) => folder.as_str(),
        };
        self.journaled(
            SyncKind::Activation,
            Some(scope),
            self.activation.activate(&target),
        )
        .await
    }

    async fn journaled<T, F>(&self, kind: SyncKind, scope: Option<&str>, run: F) -> SyncResult<T>
    where
        T: Serialize,
        F: Future<Output = SyncResult<T>>,
    {
        let run_id = self.journal.start(kind, scope).await;

        match run.await {
            Ok(stats) => {
                self.journal.complete(run_id, &stats).await;
                Ok(stats)
            }
            Err(e) => {
                error!("❌ {} run failed ({:?}): {}", kind, scope, e);
                self.journal.fail(run_id, &e.to_string()).await;
                Err(e)
            }
        }
    }
}
