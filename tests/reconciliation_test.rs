mod common;

use catalog_sync::config::CatalogConfig;
use catalog_sync::entities::{prelude::*, *};
use catalog_sync::services::sync_journal::{RUN_COMPLETED, RUN_FAILED, SyncKind};
use catalog_sync::{CatalogService, SyncError};
use common::{BASE_URL, FIXTURE, MockBucket, MockSigner, catalog, setup_test_db, test_config};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

async fn staged_model(db: &DatabaseConnection, folder: &str) -> Option<staged_models::Model> {
    StagedModels::find()
        .filter(staged_models::Column::FolderName.eq(folder))
        .one(db)
        .await
        .unwrap()
}

async fn staged_post(db: &DatabaseConnection, model_id: &str, folder: &str) -> Option<staged_posts::Model> {
    StagedPosts::find()
        .filter(staged_posts::Column::ModelId.eq(model_id))
        .filter(staged_posts::Column::FolderName.eq(folder))
        .one(db)
        .await
        .unwrap()
}

fn summary_len(post: &staged_posts::Model, kind: &str) -> usize {
    post.media_summary[kind].as_array().map(Vec::len).unwrap_or(0)
}

#[tokio::test]
async fn test_full_sync_builds_catalog_with_aggregates() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket, MockSigner::new());

    let stats = service.run_full_sync().await.unwrap();
    assert_eq!(stats.models, 2);
    assert_eq!(stats.posts, 3);
    assert_eq!(stats.media, 5);
    assert_eq!(stats.objects_scanned, 10);
    assert_eq!(stats.pages, 5);

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert_eq!(model_a.post_count, 2);
    assert_eq!(model_a.status, "staged");
    assert!(model_a.last_synced_at.is_some());
    // cover.jpg only shows up on the third page, after ModelA was created
    assert_eq!(model_a.thumbnail_key.as_deref(), Some("ModelA/cover.jpg"));
    assert_eq!(
        model_a.icon_url.as_deref(),
        Some(format!("{}/ModelA/profile/icon.webp", BASE_URL).as_str())
    );
    assert_eq!(
        model_a.banner_url.as_deref(),
        Some(format!("{}/ModelA/profile/banner.webp", BASE_URL).as_str())
    );

    let post1 = staged_post(&db, &model_a.id, "Post1").await.unwrap();
    assert_eq!(summary_len(&post1, "images"), 2);
    assert_eq!(summary_len(&post1, "videos"), 0);
    assert_eq!(
        post1.media_summary["images"][0],
        format!("{}/ModelA/Post1/a.jpg", BASE_URL)
    );

    let post2 = staged_post(&db, &model_a.id, "Post2").await.unwrap();
    assert_eq!(summary_len(&post2, "images"), 1);
    assert_eq!(summary_len(&post2, "videos"), 1);

    let model_b = staged_model(&db, "ModelB").await.unwrap();
    assert_eq!(model_b.post_count, 1);
    assert!(model_b.thumbnail_key.is_none());

    let video = StagedMedia::find()
        .filter(staged_media::Column::ObjectKey.eq("ModelA/Post2/clip.mp4"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.media_type, "video");
}

#[tokio::test]
async fn test_second_full_sync_is_idempotent() {
    let db = setup_test_db().await;
    let service = catalog(&db, MockBucket::new(FIXTURE), MockSigner::new());

    service.run_full_sync().await.unwrap();
    let second = service.run_full_sync().await.unwrap();

    assert_eq!(second.models, 0);
    assert_eq!(second.posts, 0);
    assert_eq!(second.media, 0);
    assert_eq!(second.media_updated, 5);
    assert_eq!(second.deleted_models, 0);
    assert_eq!(second.deleted_posts, 0);
    assert_eq!(second.deleted_media, 0);
    assert!(!second.has_changes());

    assert_eq!(StagedModels::find().count(&db).await.unwrap(), 2);
    assert_eq!(StagedPosts::find().count(&db).await.unwrap(), 3);
    assert_eq!(StagedMedia::find().count(&db).await.unwrap(), 5);
}

#[tokio::test]
async fn test_scoped_sync_deletes_removed_post_only() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelA/Post2/");
    let stats = service.run_scoped_sync("ModelA").await.unwrap();

    assert_eq!(stats.deleted_posts, 1);
    assert_eq!(stats.deleted_media, 2);
    assert_eq!(stats.deleted_models, 0);

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert_eq!(model_a.post_count, 1);
    assert!(staged_post(&db, &model_a.id, "Post2").await.is_none());
    assert!(staged_post(&db, &model_a.id, "Post1").await.is_some());

    let model_b = staged_model(&db, "ModelB").await.unwrap();
    assert_eq!(model_b.post_count, 1);
    assert!(staged_post(&db, &model_b.id, "Post1").await.is_some());
}

#[tokio::test]
async fn test_scoped_sync_never_deletes_other_models() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelB/");
    let scoped = service.run_scoped_sync("ModelA").await.unwrap();
    assert_eq!(scoped.deleted_models, 0);
    assert_eq!(scoped.deleted_posts, 0);

    let model_b = staged_model(&db, "ModelB").await.unwrap();
    assert_eq!(model_b.post_count, 1);

    // Only a completed full pass may remove ModelB
    let full = service.run_full_sync().await.unwrap();
    assert_eq!(full.deleted_models, 1);
    assert_eq!(full.deleted_posts, 1);
    assert!(staged_model(&db, "ModelB").await.is_none());
    assert_eq!(StagedMedia::find().count(&db).await.unwrap(), 4);
}

#[tokio::test]
async fn test_scoped_sync_creates_unknown_model() {
    let db = setup_test_db().await;
    let service = catalog(&db, MockBucket::new(FIXTURE), MockSigner::new());

    let first = service.run_scoped_sync("Newcomer").await.unwrap();
    assert_eq!(first.models, 1);
    assert_eq!(first.pages, 1);

    let newcomer = staged_model(&db, "Newcomer").await.unwrap();
    assert_eq!(newcomer.post_count, 0);

    let second = service.run_scoped_sync("Newcomer").await.unwrap();
    assert_eq!(second.models, 0);
    assert!(staged_model(&db, "Newcomer").await.is_some());
    assert!(staged_model(&db, "ModelA").await.is_none());
}

#[tokio::test]
async fn test_removed_media_is_swept_and_summary_shrinks() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelA/Post1/b.png");
    let stats = service.run_full_sync().await.unwrap();
    assert_eq!(stats.deleted_media, 1);
    assert_eq!(stats.deleted_posts, 0);

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    let post1 = staged_post(&db, &model_a.id, "Post1").await.unwrap();
    assert_eq!(summary_len(&post1, "images"), 1);
}

#[tokio::test]
async fn test_new_objects_are_added_incrementally() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.put("ModelB/Post2/clip.webm");
    bucket.put("ModelC/Post1/one.jpg");
    let stats = service.run_full_sync().await.unwrap();

    assert_eq!(stats.models, 1);
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.media, 2);
    assert_eq!(stats.media_updated, 5);

    let model_b = staged_model(&db, "ModelB").await.unwrap();
    assert_eq!(model_b.post_count, 2);
    let post2 = staged_post(&db, &model_b.id, "Post2").await.unwrap();
    assert_eq!(summary_len(&post2, "videos"), 1);
}

#[tokio::test]
async fn test_truncated_listing_without_token_never_deletes() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelA/Post2/");
    bucket.break_pagination();

    let result = service.run_full_sync().await;
    assert!(matches!(result, Err(SyncError::BrokenPagination(None))));

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert!(staged_post(&db, &model_a.id, "Post2").await.is_some());
    assert_eq!(StagedMedia::find().count(&db).await.unwrap(), 5);

    let runs = service.journal().recent(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    let failed = runs.iter().find(|run| run.status == RUN_FAILED).unwrap();
    assert!(failed.error.as_deref().unwrap_or_default().contains("truncated"));
}

#[tokio::test]
async fn test_scoped_truncated_listing_never_deletes() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    // ModelA keeps five keys, so its first page of two is truncated
    bucket.remove_prefix("ModelA/Post2/");
    bucket.break_pagination();

    let result = service.run_scoped_sync("ModelA").await;
    assert!(matches!(
        result,
        Err(SyncError::BrokenPagination(Some(ref prefix))) if prefix == "ModelA/"
    ));

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert!(staged_post(&db, &model_a.id, "Post2").await.is_some());
    assert_eq!(model_a.post_count, 2);
    assert_eq!(model_a.thumbnail_key.as_deref(), Some("ModelA/cover.jpg"));
    assert_eq!(StagedPosts::find().count(&db).await.unwrap(), 3);
    assert_eq!(StagedMedia::find().count(&db).await.unwrap(), 5);
}

#[tokio::test]
async fn test_resync_rewrites_media_url_in_place() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    catalog(&db, bucket.clone(), MockSigner::new())
        .run_full_sync()
        .await
        .unwrap();

    let moved = CatalogService::new(
        db.clone(),
        bucket,
        MockSigner::new(),
        CatalogConfig {
            public_base_url: Some("https://other".to_string()),
            ..test_config()
        },
    );
    let stats = moved.run_full_sync().await.unwrap();
    assert_eq!(stats.media, 0);
    assert_eq!(stats.media_updated, 5);
    assert_eq!(StagedMedia::find().count(&db).await.unwrap(), 5);

    let rows = StagedMedia::find()
        .filter(staged_media::Column::ObjectKey.eq("ModelA/Post1/a.jpg"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "https://other/ModelA/Post1/a.jpg");

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert_eq!(
        model_a.icon_url.as_deref(),
        Some("https://other/ModelA/profile/icon.webp")
    );
    let post1 = staged_post(&db, &model_a.id, "Post1").await.unwrap();
    assert_eq!(post1.media_summary["images"][0], "https://other/ModelA/Post1/a.jpg");
}

#[tokio::test]
async fn test_removed_cover_and_profile_images_are_cleared() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelA/cover.jpg");
    bucket.remove_prefix("ModelA/profile/");
    service.run_full_sync().await.unwrap();

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert!(model_a.thumbnail_key.is_none());
    assert!(model_a.icon_url.is_none());
    assert!(model_a.banner_url.is_none());
    assert_eq!(model_a.post_count, 2);

    // Nothing left to sign or fall back to
    service.activate("ModelA").await.unwrap();
    let production = ProductionModels::find()
        .filter(production_models::Column::Name.eq("ModelA"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(production.thumbnail_key.is_none());
    assert!(production.icon_url.is_none());
    assert!(production.banner_url.is_none());
}

#[tokio::test]
async fn test_scoped_sync_replaces_cover_and_clears_banner() {
    let db = setup_test_db().await;
    let bucket = MockBucket::new(FIXTURE);
    let service = catalog(&db, bucket.clone(), MockSigner::new());
    service.run_full_sync().await.unwrap();

    bucket.remove_prefix("ModelA/cover.jpg");
    bucket.remove_prefix("ModelA/profile/banner.webp");
    bucket.put("ModelA/alt.png");
    service.run_scoped_sync("ModelA").await.unwrap();

    let model_a = staged_model(&db, "ModelA").await.unwrap();
    assert_eq!(model_a.thumbnail_key.as_deref(), Some("ModelA/alt.png"));
    assert_eq!(
        model_a.icon_url.as_deref(),
        Some(format!("{}/ModelA/profile/icon.webp", BASE_URL).as_str())
    );
    assert!(model_a.banner_url.is_none());
}

#[tokio::test]
async fn test_scoped_sync_rejects_nested_folder() {
    let db = setup_test_db().await;
    let service = catalog(&db, MockBucket::new(FIXTURE), MockSigner::new());

    let result = service.run_scoped_sync("ModelA/Post1").await;
    assert!(matches!(result, Err(SyncError::InvalidScope(_))));
    assert_eq!(StagedModels::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_journal_records_completed_run() {
    let db = setup_test_db().await;
    let service = catalog(&db, MockBucket::new(FIXTURE), MockSigner::new());
    service.run_full_sync().await.unwrap();

    let runs = service.journal().recent(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].kind, "full");
    assert_eq!(runs[0].status, RUN_COMPLETED);
    assert!(runs[0].finished_at.is_some());
    assert_eq!(runs[0].stats.as_ref().unwrap()["models"], 2);
    assert_eq!(runs[0].stats.as_ref().unwrap()["deletedPosts"], 0);

    let last = service.journal().last_completed(SyncKind::Full).await.unwrap();
    assert_eq!(last.map(|run| run.id), Some(runs[0].id.clone()));
    assert!(
        service
            .journal()
            .last_completed(SyncKind::Activation)
            .await
            .unwrap()
            .is_none()
    );
}
