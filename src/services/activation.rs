use crate::config::CatalogConfig;
use crate::entities::{prelude::*, *};
use crate::error::SyncResult;
use crate::models::{ActivationStats, ActivationTarget};
use crate::services::catalog_repository::{STATUS_ACTIVE, StagedGraph};
use crate::services::key_parser::MediaKind;
use crate::services::reconciliation::{ReconciliationEngine, validate_folder};
use crate::services::storage::{StorageService, UrlSigner};
use crate::utils::object_url::slugify;
use chrono::Utc;
use futures::future::join_all;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Promotes staged models into the production catalog.
pub struct ActivationService {
    engine: ReconciliationEngine,
    storage: Arc<dyn StorageService>,
    signer: Arc<dyn UrlSigner>,
    config: CatalogConfig,
}

impl ActivationService {
    pub fn new(
        engine: ReconciliationEngine,
        storage: Arc<dyn StorageService>,
        signer: Arc<dyn UrlSigner>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            engine,
            storage,
            signer,
            config,
        }
    }

    pub async fn activate(&self, target: &ActivationTarget) -> SyncResult<ActivationStats> {
        let folders = match target {
            ActivationTarget::All => self.storage.list_model_folders().await?,
            ActivationTarget::Model(folder) => vec![folder.clone()],
        };
        info!("🚚 Activating {} model folder(s)", folders.len());

        let mut totals = ActivationStats::default();
        for folder in &folders {
            totals += self.activate_model(folder).await?;
        }

        info!(
            "✅ Activation finished: {} processed, {} new models, {} new posts",
            totals.processed_count, totals.new_models_count, totals.new_posts_count
        );
        Ok(totals)
    }

    /// Refreshes the staged copy of `folder`, then copies it to production.
    /// Holds the folder's lock across both steps.
    async fn activate_model(&self, folder: &str) -> SyncResult<ActivationStats> {
        validate_folder(folder)?;
        let _guard = self.engine.locks().lock_model(folder).await;

        self.engine.scoped_sync(folder).await?;

        let repo = self.engine.repository();
        let Some(graph) = repo.load_graph(folder).await? else {
            warn!("Staged model '{}' vanished before promotion", folder);
            return Ok(ActivationStats::default());
        };

        let (production, created) = self.upsert_production_model(&graph).await?;
        let new_posts = self.upsert_production_posts(&production, &graph).await?;
        repo.set_model_status(&graph.model.id, STATUS_ACTIVE).await?;

        info!(
            "📦 Promoted '{}' ({} posts, {} new)",
            folder,
            graph.posts.len(),
            new_posts
        );

        Ok(ActivationStats {
            processed_count: 1,
            new_models_count: u64::from(created),
            new_posts_count: new_posts,
        })
    }

    /// Finds the production model by name or creates it. Returns whether it
    /// was created by this call.
    async fn upsert_production_model(
        &self,
        graph: &StagedGraph,
    ) -> Result<(production_models::Model, bool), DbErr> {
        let db = self.engine.repository().connection();
        let staged = &graph.model;

        if let Some(existing) = find_production_model(db, &staged.folder_name).await? {
            return Ok((existing, false));
        }

        let signed_thumbnail = match staged.thumbnail_key.as_deref() {
            Some(key) => self.signer.sign(key, self.config.signed_url_ttl_secs).await,
            None => String::new(),
        };
        let prefer_signed = |fallback: &Option<String>| {
            if signed_thumbnail.is_empty() {
                fallback.clone()
            } else {
                Some(signed_thumbnail.clone())
            }
        };

        let row = production_models::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(staged.folder_name.clone()),
            slug: Set(slugify(&staged.folder_name)),
            staged_model_id: Set(Some(staged.id.clone())),
            thumbnail_key: Set(staged.thumbnail_key.clone()),
            icon_url: Set(prefer_signed(&staged.icon_url)),
            banner_url: Set(prefer_signed(&staged.banner_url)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };

        let inserted = ProductionModels::insert(row)
            .on_conflict(
                OnConflict::column(production_models::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let model = find_production_model(db, &staged.folder_name)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("production model {}", staged.folder_name))
            })?;
        Ok((model, inserted > 0))
    }

    /// Upserts one production post per staged post that has media, keyed on
    /// `(model_id, object_key)` of its primary media. Returns how many keys
    /// were not promoted before.
    async fn upsert_production_posts(
        &self,
        production: &production_models::Model,
        graph: &StagedGraph,
    ) -> Result<u64, DbErr> {
        let db = self.engine.repository().connection();

        let primaries: Vec<(&staged_posts::Model, &staged_media::Model)> = graph
            .posts
            .iter()
            .filter_map(|(post, media)| primary_media(media).map(|item| (post, item)))
            .collect();
        if primaries.is_empty() {
            return Ok(0);
        }

        let promoted: HashSet<String> = ProductionPosts::find()
            .select_only()
            .column(production_posts::Column::ObjectKey)
            .filter(production_posts::Column::ModelId.eq(&production.id))
            .into_tuple::<String>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        // Signing has no ordering dependency; fan out.
        let ttl = self.config.signed_url_ttl_secs;
        let urls = join_all(
            primaries
                .iter()
                .map(|(_, item)| self.signer.sign(&item.object_key, ttl)),
        )
        .await;

        let now = Utc::now();
        let mut new_posts = 0;
        let rows: Vec<production_posts::ActiveModel> = primaries
            .iter()
            .zip(urls)
            .map(|((post, item), url)| {
                if !promoted.contains(&item.object_key) {
                    new_posts += 1;
                }
                production_posts::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    model_id: Set(production.id.clone()),
                    object_key: Set(item.object_key.clone()),
                    media_type: Set(item.media_type.clone()),
                    content_url: Set(url),
                    title: Set(post.title.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
            })
            .collect();

        for chunk in rows.chunks(self.config.insert_chunk_size.max(1)) {
            ProductionPosts::insert_many(chunk.iter().cloned())
                .on_conflict(
                    OnConflict::columns([
                        production_posts::Column::ModelId,
                        production_posts::Column::ObjectKey,
                    ])
                    .update_columns([
                        production_posts::Column::ContentUrl,
                        production_posts::Column::MediaType,
                        production_posts::Column::Title,
                        production_posts::Column::UpdatedAt,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }

        Ok(new_posts)
    }
}

async fn find_production_model(
    db: &sea_orm::DatabaseConnection,
    name: &str,
) -> Result<Option<production_models::Model>, DbErr> {
    ProductionModels::find()
        .filter(production_models::Column::Name.eq(name))
        .one(db)
        .await
}

/// The post's first video, otherwise its first media item.
/// `media` is expected in object-key order.
pub fn primary_media(media: &[staged_media::Model]) -> Option<&staged_media::Model> {
    media
        .iter()
        .find(|item| item.media_type == MediaKind::Video.as_str())
        .or_else(|| media.first())
}
