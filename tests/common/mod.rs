#![allow(dead_code)]

use async_trait::async_trait;
use catalog_sync::CatalogService;
use catalog_sync::config::CatalogConfig;
use catalog_sync::infrastructure::database::run_migrations;
use catalog_sync::services::storage::{ListPage, StorageService, UrlSigner};
use sea_orm::{Database, DatabaseConnection};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://cdn.test";

/// Keys used by most tests: two models, three posts, five media files.
pub const FIXTURE: &[&str] = &[
    "ModelA/cover.jpg",
    "ModelA/profile/icon.webp",
    "ModelA/profile/banner.webp",
    "ModelA/Post1/a.jpg",
    "ModelA/Post1/b.png",
    "ModelA/Post2/clip.mp4",
    "ModelA/Post2/still.jpg",
    "ModelB/",
    "ModelB/Post1/x.webp",
    "notes.txt",
];

/// In-memory bucket listing keys in lexical order, like S3.
/// The continuation token is the last key of the previous page.
#[derive(Default)]
pub struct MockBucket {
    keys: Mutex<BTreeSet<String>>,
    broken_pagination: AtomicBool,
}

impl MockBucket {
    pub fn new(keys: &[&str]) -> Arc<Self> {
        let bucket = Self::default();
        for key in keys {
            bucket.put(key);
        }
        Arc::new(bucket)
    }

    pub fn put(&self, key: &str) {
        self.keys.lock().unwrap().insert(key.to_string());
    }

    pub fn remove_prefix(&self, prefix: &str) {
        self.keys.lock().unwrap().retain(|key| !key.starts_with(prefix));
    }

    /// Truncated pages stop carrying a continuation token
    pub fn break_pagination(&self) {
        self.broken_pagination.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageService for MockBucket {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> anyhow::Result<ListPage> {
        let keys = self.keys.lock().unwrap();
        let mut matching = keys
            .iter()
            .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
            .filter(|key| {
                continuation_token
                    .as_deref()
                    .is_none_or(|after| key.as_str() > after)
            });

        let page: Vec<String> = matching.by_ref().take(max_keys as usize).cloned().collect();
        let is_truncated = matching.next().is_some();
        let next_token = if is_truncated && !self.broken_pagination.load(Ordering::SeqCst) {
            page.last().cloned()
        } else {
            None
        };

        Ok(ListPage {
            keys: page,
            is_truncated,
            next_token,
        })
    }

    async fn list_model_folders(&self) -> anyhow::Result<Vec<String>> {
        let keys = self.keys.lock().unwrap();
        let folders: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| key.split_once('/'))
            .map(|(folder, _)| folder.to_string())
            .filter(|folder| !folder.is_empty())
            .collect();
        Ok(folders.into_iter().collect())
    }
}

/// Produces `signed://<key>?ttl=<ttl>`, or `""` once failures are switched on.
#[derive(Default)]
pub struct MockSigner {
    failing: AtomicBool,
}

impl MockSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let signer = Self::default();
        signer.failing.store(true, Ordering::SeqCst);
        Arc::new(signer)
    }
}

#[async_trait]
impl UrlSigner for MockSigner {
    async fn sign(&self, key: &str, ttl_secs: u64) -> String {
        if self.failing.load(Ordering::SeqCst) || key.is_empty() {
            return String::new();
        }
        format!("signed://{}?ttl={}", key, ttl_secs)
    }
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    run_migrations(&db).await.unwrap();
    db
}

/// Tiny pages and insert chunks so every test crosses page and chunk borders
pub fn test_config() -> CatalogConfig {
    CatalogConfig {
        list_page_size: 2,
        insert_chunk_size: 2,
        public_base_url: Some(BASE_URL.to_string()),
        ..Default::default()
    }
}

pub fn catalog(
    db: &DatabaseConnection,
    bucket: Arc<MockBucket>,
    signer: Arc<MockSigner>,
) -> CatalogService {
    CatalogService::new(db.clone(), bucket, signer, test_config())
}
