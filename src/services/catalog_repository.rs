use crate::entities::{prelude::*, *};
use crate::services::key_parser::MediaKind;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, Statement,
};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

pub const STATUS_STAGED: &str = "staged";
pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone)]
pub struct NewModel {
    pub folder_name: String,
    pub thumbnail_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub model_id: String,
    pub folder_name: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub post_id: String,
    pub object_key: String,
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.icon_url.is_none() && self.banner_url.is_none()
    }
}

/// Which profile fields of a model to reset to NULL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileClear {
    pub icon: bool,
    pub banner: bool,
}

impl ProfileClear {
    pub fn is_empty(&self) -> bool {
        !self.icon && !self.banner
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPost {
    pub id: String,
    pub model_id: String,
    pub folder_name: String,
}

/// A staged model with its posts and each post's media, ordered by folder / key
#[derive(Debug, Clone)]
pub struct StagedGraph {
    pub model: staged_models::Model,
    pub posts: Vec<(staged_posts::Model, Vec<staged_media::Model>)>,
}

/// Batch primitives over the staged schema. Every write is idempotent under
/// the schema's unique keys, so a failed pass can simply be re-run.
#[derive(Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
    chunk_size: usize,
}

impl CatalogRepository {
    pub fn new(db: DatabaseConnection, chunk_size: usize) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // ---- identity maps ----

    pub async fn load_models(
        &self,
        folder: Option<&str>,
    ) -> Result<Vec<staged_models::Model>, DbErr> {
        let mut query = StagedModels::find();
        if let Some(folder) = folder {
            query = query.filter(staged_models::Column::FolderName.eq(folder));
        }
        query.all(&self.db).await
    }

    pub async fn load_posts(&self, model_id: Option<&str>) -> Result<Vec<KnownPost>, DbErr> {
        let mut query = StagedPosts::find()
            .select_only()
            .column(staged_posts::Column::Id)
            .column(staged_posts::Column::ModelId)
            .column(staged_posts::Column::FolderName);
        if let Some(model_id) = model_id {
            query = query.filter(staged_posts::Column::ModelId.eq(model_id));
        }

        let rows: Vec<(String, String, String)> = query.into_tuple().all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(id, model_id, folder_name)| KnownPost {
                id,
                model_id,
                folder_name,
            })
            .collect())
    }

    /// `(id, object_key)` for every media row, optionally limited to one model
    pub async fn load_media_keys(
        &self,
        model_id: Option<&str>,
    ) -> Result<Vec<(String, String)>, DbErr> {
        let mut query = StagedMedia::find()
            .select_only()
            .column(staged_media::Column::Id)
            .column(staged_media::Column::ObjectKey);
        if let Some(model_id) = model_id {
            query = query
                .inner_join(StagedPosts)
                .filter(staged_posts::Column::ModelId.eq(model_id));
        }
        query.into_tuple().all(&self.db).await
    }

    // ---- inserts ----

    /// Inserts models, ignoring folder-name conflicts.
    /// Returns `(folder_name, id)` for the rows actually created.
    pub async fn insert_models(&self, records: &[NewModel]) -> Result<Vec<(String, String)>, DbErr> {
        let backend = self.db.get_database_backend();
        let mut inserted = Vec::new();

        for chunk in records.chunks(self.chunk_size) {
            let now = Utc::now();
            let rows = chunk.iter().map(|record| staged_models::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                folder_name: Set(record.folder_name.clone()),
                thumbnail_key: Set(record.thumbnail_key.clone()),
                icon_url: Set(None),
                banner_url: Set(None),
                post_count: Set(0),
                status: Set(STATUS_STAGED.to_string()),
                last_synced_at: Set(None),
                created_at: Set(now),
            });

            let mut stmt = StagedModels::insert_many(rows)
                .on_conflict(
                    OnConflict::column(staged_models::Column::FolderName)
                        .do_nothing()
                        .to_owned(),
                )
                .into_query();
            stmt.returning(Query::returning().columns([
                staged_models::Column::Id,
                staged_models::Column::FolderName,
            ]));

            for row in self.db.query_all(backend.build(&stmt)).await? {
                let id: String = row.try_get("", "id")?;
                let folder_name: String = row.try_get("", "folder_name")?;
                inserted.push((folder_name, id));
            }
        }

        Ok(inserted)
    }

    /// Inserts posts, ignoring `(model_id, folder_name)` conflicts.
    /// Returns the rows actually created.
    pub async fn insert_posts(&self, records: &[NewPost]) -> Result<Vec<KnownPost>, DbErr> {
        let backend = self.db.get_database_backend();
        let mut inserted = Vec::new();

        for chunk in records.chunks(self.chunk_size) {
            let now = Utc::now();
            let rows = chunk.iter().map(|record| staged_posts::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                model_id: Set(record.model_id.clone()),
                folder_name: Set(record.folder_name.clone()),
                title: Set(record.folder_name.clone()),
                media_summary: Set(json!({ "images": [], "videos": [] })),
                created_at: Set(now),
            });

            let mut stmt = StagedPosts::insert_many(rows)
                .on_conflict(
                    OnConflict::columns([
                        staged_posts::Column::ModelId,
                        staged_posts::Column::FolderName,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .into_query();
            stmt.returning(Query::returning().columns([
                staged_posts::Column::Id,
                staged_posts::Column::ModelId,
                staged_posts::Column::FolderName,
            ]));

            for row in self.db.query_all(backend.build(&stmt)).await? {
                inserted.push(KnownPost {
                    id: row.try_get("", "id")?,
                    model_id: row.try_get("", "model_id")?,
                    folder_name: row.try_get("", "folder_name")?,
                });
            }
        }

        Ok(inserted)
    }

    /// Upserts media keyed on `object_key`; an existing row gets the new url.
    pub async fn insert_media(&self, records: &[NewMedia]) -> Result<u64, DbErr> {
        let mut written = 0;

        for chunk in records.chunks(self.chunk_size) {
            let now = Utc::now();
            let rows = chunk.iter().map(|record| staged_media::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                post_id: Set(record.post_id.clone()),
                object_key: Set(record.object_key.clone()),
                media_type: Set(record.kind.as_str().to_string()),
                url: Set(record.url.clone()),
                updated_at: Set(now),
            });

            written += StagedMedia::insert_many(rows)
                .on_conflict(
                    OnConflict::column(staged_media::Column::ObjectKey)
                        .update_columns([
                            staged_media::Column::Url,
                            staged_media::Column::MediaType,
                            staged_media::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await?;
        }

        Ok(written)
    }

    /// Creates the model row for `folder` if it does not exist yet.
    /// Returns the row and whether it was created by this call.
    pub async fn ensure_model(&self, folder: &str) -> Result<(staged_models::Model, bool), DbErr> {
        if let Some(model) = self.find_model(folder).await? {
            return Ok((model, false));
        }

        let created = self
            .insert_models(&[NewModel {
                folder_name: folder.to_string(),
                thumbnail_key: None,
            }])
            .await?;

        let model = self
            .find_model(folder)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("staged model {}", folder)))?;
        Ok((model, !created.is_empty()))
    }

    pub async fn find_model(&self, folder: &str) -> Result<Option<staged_models::Model>, DbErr> {
        StagedModels::find()
            .filter(staged_models::Column::FolderName.eq(folder))
            .one(&self.db)
            .await
    }

    // ---- deletes ----

    pub async fn delete_media(&self, ids: &[String]) -> Result<u64, DbErr> {
        let mut deleted = 0;
        for chunk in ids.chunks(self.chunk_size) {
            deleted += StagedMedia::delete_many()
                .filter(staged_media::Column::Id.is_in(chunk.iter().cloned()))
                .exec(&self.db)
                .await?
                .rows_affected;
        }
        Ok(deleted)
    }

    /// Deletes posts and their media (children first, whatever the FK actions are)
    pub async fn delete_posts(&self, ids: &[String]) -> Result<u64, DbErr> {
        let mut deleted = 0;
        for chunk in ids.chunks(self.chunk_size) {
            StagedMedia::delete_many()
                .filter(staged_media::Column::PostId.is_in(chunk.iter().cloned()))
                .exec(&self.db)
                .await?;

            deleted += StagedPosts::delete_many()
                .filter(staged_posts::Column::Id.is_in(chunk.iter().cloned()))
                .exec(&self.db)
                .await?
                .rows_affected;
        }
        Ok(deleted)
    }

    /// Deletes models together with any posts and media still attached
    pub async fn delete_models(&self, ids: &[String]) -> Result<u64, DbErr> {
        let mut deleted = 0;
        for chunk in ids.chunks(self.chunk_size) {
            let posts_of_models = Query::select()
                .column(staged_posts::Column::Id)
                .from(StagedPosts)
                .and_where(staged_posts::Column::ModelId.is_in(chunk.iter().cloned()))
                .to_owned();

            StagedMedia::delete_many()
                .filter(staged_media::Column::PostId.in_subquery(posts_of_models))
                .exec(&self.db)
                .await?;

            StagedPosts::delete_many()
                .filter(staged_posts::Column::ModelId.is_in(chunk.iter().cloned()))
                .exec(&self.db)
                .await?;

            deleted += StagedModels::delete_many()
                .filter(staged_models::Column::Id.is_in(chunk.iter().cloned()))
                .exec(&self.db)
                .await?
                .rows_affected;
        }
        Ok(deleted)
    }

    // ---- model fields ----

    pub async fn update_model_profile(
        &self,
        model_id: &str,
        profile: ProfileUpdate,
    ) -> Result<(), DbErr> {
        if profile.is_empty() {
            return Ok(());
        }

        let mut update =
            StagedModels::update_many().filter(staged_models::Column::Id.eq(model_id));
        if let Some(icon_url) = profile.icon_url {
            update = update.col_expr(staged_models::Column::IconUrl, Expr::value(icon_url));
        }
        if let Some(banner_url) = profile.banner_url {
            update = update.col_expr(staged_models::Column::BannerUrl, Expr::value(banner_url));
        }
        update.exec(&self.db).await?;
        Ok(())
    }

    pub async fn clear_model_profile(
        &self,
        model_id: &str,
        clear: ProfileClear,
    ) -> Result<(), DbErr> {
        if clear.is_empty() {
            return Ok(());
        }

        let mut update =
            StagedModels::update_many().filter(staged_models::Column::Id.eq(model_id));
        if clear.icon {
            update = update.col_expr(
                staged_models::Column::IconUrl,
                Expr::value(Option::<String>::None),
            );
        }
        if clear.banner {
            update = update.col_expr(
                staged_models::Column::BannerUrl,
                Expr::value(Option::<String>::None),
            );
        }
        update.exec(&self.db).await?;
        Ok(())
    }

    /// `None` clears the thumbnail
    pub async fn update_model_thumbnail(
        &self,
        model_id: &str,
        key: Option<&str>,
    ) -> Result<(), DbErr> {
        StagedModels::update_many()
            .col_expr(
                staged_models::Column::ThumbnailKey,
                Expr::value(key.map(str::to_string)),
            )
            .filter(staged_models::Column::Id.eq(model_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn set_model_status(&self, model_id: &str, status: &str) -> Result<(), DbErr> {
        StagedModels::update_many()
            .col_expr(staged_models::Column::Status, Expr::value(status))
            .filter(staged_models::Column::Id.eq(model_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Stamps `last_synced_at` on every model of the scope in one statement
    pub async fn mark_synced(&self, scope_model_id: Option<&str>) -> Result<(), DbErr> {
        let mut update = StagedModels::update_many()
            .col_expr(staged_models::Column::LastSyncedAt, Expr::value(Utc::now()));
        if let Some(model_id) = scope_model_id {
            update = update.filter(staged_models::Column::Id.eq(model_id));
        }
        update.exec(&self.db).await?;
        Ok(())
    }

    // ---- aggregates ----

    /// Recomputes `post_count` and `media_summary` with set-based statements,
    /// globally or for one model.
    pub async fn recompute_aggregates(&self, scope_model_id: Option<&str>) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let values: Vec<sea_orm::Value> = scope_model_id.map(Into::into).into_iter().collect();

        for sql in [
            post_count_sql(backend, scope_model_id.is_some()),
            media_summary_sql(backend, scope_model_id.is_some()),
        ] {
            self.db
                .execute(Statement::from_sql_and_values(backend, sql, values.clone()))
                .await?;
        }
        Ok(())
    }

    // ---- reads for promotion ----

    pub async fn load_graph(&self, folder: &str) -> Result<Option<StagedGraph>, DbErr> {
        let Some(model) = self.find_model(folder).await? else {
            return Ok(None);
        };

        let posts = StagedPosts::find()
            .filter(staged_posts::Column::ModelId.eq(&model.id))
            .order_by_asc(staged_posts::Column::FolderName)
            .all(&self.db)
            .await?;

        let media = StagedMedia::find()
            .inner_join(StagedPosts)
            .filter(staged_posts::Column::ModelId.eq(&model.id))
            .order_by_asc(staged_media::Column::ObjectKey)
            .all(&self.db)
            .await?;

        let mut by_post: HashMap<String, Vec<staged_media::Model>> = HashMap::new();
        for item in media {
            by_post.entry(item.post_id.clone()).or_default().push(item);
        }

        let posts = posts
            .into_iter()
            .map(|post| {
                let media = by_post.remove(&post.id).unwrap_or_default();
                (post, media)
            })
            .collect();

        Ok(Some(StagedGraph { model, posts }))
    }
}

fn placeholder(backend: DatabaseBackend) -> &'static str {
    match backend {
        DatabaseBackend::Postgres => "$1",
        _ => "?",
    }
}

fn post_count_sql(backend: DatabaseBackend, scoped: bool) -> String {
    let mut sql = "UPDATE staged_models SET post_count = \
         (SELECT COUNT(*) FROM staged_posts p WHERE p.model_id = staged_models.id)"
        .to_string();
    if scoped {
        sql.push_str(&format!(" WHERE id = {}", placeholder(backend)));
    }
    sql
}

fn media_summary_sql(backend: DatabaseBackend, scoped: bool) -> String {
    let array_of = |media_type: &str| match backend {
        DatabaseBackend::Postgres => format!(
            "COALESCE((SELECT json_agg(m.url ORDER BY m.object_key) FROM staged_media m \
             WHERE m.post_id = staged_posts.id AND m.media_type = '{media_type}'), '[]'::json)"
        ),
        // json() keeps the aggregate an array instead of a quoted string
        _ => format!(
            "json((SELECT json_group_array(m.url ORDER BY m.object_key) FROM staged_media m \
             WHERE m.post_id = staged_posts.id AND m.media_type = '{media_type}'))"
        ),
    };
    let build_object = match backend {
        DatabaseBackend::Postgres => "json_build_object",
        _ => "json_object",
    };

    let mut sql = format!(
        "UPDATE staged_posts SET media_summary = {build_object}('images', {}, 'videos', {})",
        array_of(MediaKind::Image.as_str()),
        array_of(MediaKind::Video.as_str()),
    );
    if scoped {
        sql.push_str(&format!(" WHERE model_id = {}", placeholder(backend)));
    }
    sql
}
