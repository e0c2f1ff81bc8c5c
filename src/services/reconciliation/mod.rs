//! Bucket-to-database reconciliation.
//!
//! A pass walks the bucket listing page by page, stages any model, post or
//! media row it has not seen before, and only once the listing is exhausted
//! deletes rows that were never observed. Aggregates are recomputed with
//! set-based statements at the end.

use crate::config::CatalogConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::SyncStats;
use crate::services::catalog_repository::CatalogRepository;
use crate::services::storage::StorageService;
use crate::utils::keyed_mutex::SyncLocks;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};

pub mod context;
mod passes;

pub use context::{Enumeration, SyncContext};

#[derive(Clone)]
pub struct ReconciliationEngine {
    repo: CatalogRepository,
    storage: Arc<dyn StorageService>,
    config: CatalogConfig,
    locks: SyncLocks,
}

impl ReconciliationEngine {
    pub fn new(
        repo: CatalogRepository,
        storage: Arc<dyn StorageService>,
        config: CatalogConfig,
        locks: SyncLocks,
    ) -> Self {
        Self {
            repo,
            storage,
            config,
            locks,
        }
    }

    pub fn locks(&self) -> &SyncLocks {
        &self.locks
    }

    pub fn repository(&self) -> &CatalogRepository {
        &self.repo
    }

    /// Reconciles the whole bucket. Waits for any scoped run to finish first.
    pub async fn run_full_sync(&self) -> SyncResult<SyncStats> {
        let _guard = self.locks.lock_full().await;
        info!("🔒 Full sync lock acquired");

        let ctx = SyncContext::new(
            None,
            self.repo.load_models(None).await?,
            self.repo.load_posts(None).await?,
            self.repo.load_media_keys(None).await?,
        );
        self.reconcile(ctx, None).await
    }

    /// Reconciles a single model folder, creating the model row if needed.
    pub async fn run_scoped_sync(&self, folder: &str) -> SyncResult<SyncStats> {
        validate_folder(folder)?;
        let _guard = self.locks.lock_model(folder).await;
        self.scoped_sync(folder).await
    }

    /// Scoped sync body. The caller must hold the model lock for `folder`.
    pub(crate) async fn scoped_sync(&self, folder: &str) -> SyncResult<SyncStats> {
        validate_folder(folder)?;

        let (model, created) = self.repo.ensure_model(folder).await?;
        if created {
            info!("🆕 Staged model '{}' created ahead of scan", folder);
        }

        let mut ctx = SyncContext::new(
            Some(folder.to_string()),
            vec![model.clone()],
            self.repo.load_posts(Some(&model.id)).await?,
            self.repo.load_media_keys(Some(&model.id)).await?,
        );
        if created {
            ctx.stats.models += 1;
        }

        self.reconcile(ctx, Some(&model.id)).await
    }

    async fn reconcile(
        &self,
        ctx: SyncContext,
        scope_model_id: Option<&str>,
    ) -> SyncResult<SyncStats> {
        let span = info_span!("reconcile", scope = ctx.scope().unwrap_or("*"));
        self.reconcile_pass(ctx, scope_model_id).instrument(span).await
    }

    async fn reconcile_pass(
        &self,
        mut ctx: SyncContext,
        scope_model_id: Option<&str>,
    ) -> SyncResult<SyncStats> {
        let prefix = ctx.scope().map(|folder| format!("{}/", folder));
        info!(
            "🔄 Reconciling {}",
            prefix.as_deref().unwrap_or("entire bucket")
        );

        self.walk(&mut ctx, prefix.as_deref()).await?;
        self.sweep(&mut ctx).await?;

        for (model_id, key) in ctx.thumbnail_updates()? {
            self.repo.update_model_thumbnail(&model_id, key.as_deref()).await?;
        }
        for (model_id, clear) in ctx.profile_clears()? {
            debug!("Clearing unlisted profile fields of model {}: {:?}", model_id, clear);
            self.repo.clear_model_profile(&model_id, clear).await?;
        }

        self.repo.recompute_aggregates(scope_model_id).await?;
        self.repo.mark_synced(scope_model_id).await?;

        let stats = ctx.stats;
        info!(
            "✅ Reconciled {} objects over {} pages: +{} models, +{} posts, +{} media, -{} models, -{} posts, -{} media",
            stats.objects_scanned,
            stats.pages,
            stats.models,
            stats.posts,
            stats.media,
            stats.deleted_models,
            stats.deleted_posts,
            stats.deleted_media
        );
        Ok(stats)
    }

    /// Follows continuation tokens until the listing reports no truncation.
    /// Marks the context complete only on that exit path.
    async fn walk(&self, ctx: &mut SyncContext, prefix: Option<&str>) -> SyncResult<()> {
        let mut token: Option<String> = None;

        loop {
            let page = self
                .storage
                .list_page(prefix, token.take(), self.config.list_page_size)
                .await?;

            ctx.stats.pages += 1;
            ctx.stats.objects_scanned += page.keys.len() as u64;
            debug!(
                "Page {}: {} keys (truncated: {})",
                ctx.stats.pages,
                page.keys.len(),
                page.is_truncated
            );

            self.apply_page(ctx, &page.keys).await?;

            if !page.is_truncated {
                ctx.complete();
                return Ok(());
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Err(SyncError::BrokenPagination(prefix.map(str::to_string))),
            }
        }
    }

    /// Deletes rows the completed walk never observed, children first.
    async fn sweep(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let stale_media = ctx.stale_media()?;
        let stale_posts = ctx.stale_posts()?;
        let stale_models = ctx.stale_models()?;

        if !stale_media.is_empty() {
            ctx.stats.deleted_media = self.repo.delete_media(&stale_media).await?;
        }
        if !stale_posts.is_empty() {
            ctx.stats.deleted_posts = self.repo.delete_posts(&stale_posts).await?;
        }
        if !stale_models.is_empty() {
            ctx.stats.deleted_models = self.repo.delete_models(&stale_models).await?;
        }

        if ctx.stats.deleted_media + ctx.stats.deleted_posts + ctx.stats.deleted_models > 0 {
            info!(
                "🧹 Swept {} models, {} posts, {} media no longer in the bucket",
                ctx.stats.deleted_models, ctx.stats.deleted_posts, ctx.stats.deleted_media
            );
        }
        Ok(())
    }
}

/// A model folder is a single non-empty path segment
pub fn validate_folder(folder: &str) -> SyncResult<()> {
    if folder.is_empty() || folder.contains('/') {
        return Err(SyncError::InvalidScope(folder.to_string()));
    }
    Ok(())
}
