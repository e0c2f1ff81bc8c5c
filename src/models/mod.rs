use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Staged models created during the pass
    pub models: u64,
    /// Staged posts created during the pass
    pub posts: u64,
    /// Staged media rows created during the pass
    pub media: u64,
    /// Known media rows re-upserted (url refreshed)
    pub media_updated: u64,
    pub deleted_models: u64,
    pub deleted_posts: u64,
    pub deleted_media: u64,
    /// Object keys read from the bucket, including ignored ones
    pub objects_scanned: u64,
    pub pages: u64,
}

impl SyncStats {
    pub fn has_changes(&self) -> bool {
        self.models + self.posts + self.media + self.deleted_models + self.deleted_posts
            + self.deleted_media
            > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationStats {
    pub processed_count: u64,
    pub new_models_count: u64,
    pub new_posts_count: u64,
}

impl AddAssign for ActivationStats {
    fn add_assign(&mut self, other: Self) {
        self.processed_count += other.processed_count;
        self.new_models_count += other.new_models_count;
        self.new_posts_count += other.new_posts_count;
    }
}

/// What `activate` should promote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationTarget {
    All,
    Model(String),
}

impl ActivationTarget {
    /// `"all"` (any case) selects every model folder in the bucket
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            ActivationTarget::All
        } else {
            ActivationTarget::Model(value.trim_matches('/').to_string())
        }
    }
}
