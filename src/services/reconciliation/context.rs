use crate::entities::staged_models;
use crate::error::{SyncError, SyncResult};
use crate::models::SyncStats;
use crate::services::catalog_repository::{KnownPost, ProfileClear};
use crate::services::key_parser::{PROFILE_BANNER, PROFILE_ICON};
use std::collections::{HashMap, HashSet};

/// Whether the listing walk reached its last page. Sweeping is only legal
/// once the state is `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumeration {
    InProgress,
    Complete,
}

/// Identity maps and seen-sets for one reconciliation pass.
///
/// Loaded once from the database before the walk, extended as rows are
/// inserted, and dropped when the pass ends.
#[derive(Debug)]
pub struct SyncContext {
    /// Model folder this pass is limited to; `None` for the whole bucket
    scope: Option<String>,
    /// folder_name -> model id
    models: HashMap<String, String>,
    /// model id -> current thumbnail key
    thumbnails: HashMap<String, Option<String>>,
    /// (model id, post folder) -> post id
    posts: HashMap<(String, String), String>,
    /// object_key -> media id
    media: HashMap<String, String>,

    seen_models: HashSet<String>,
    seen_posts: HashSet<(String, String)>,
    seen_media: HashSet<String>,
    seen_thumbnails: HashSet<String>,
    /// first top-level image per model, in listing order
    thumbnail_candidates: HashMap<String, String>,
    /// model ids whose stored icon / banner url is set
    with_icon: HashSet<String>,
    with_banner: HashSet<String>,
    seen_icons: HashSet<String>,
    seen_banners: HashSet<String>,

    enumeration: Enumeration,
    pub stats: SyncStats,
}

impl SyncContext {
    pub fn new(
        scope: Option<String>,
        models: Vec<staged_models::Model>,
        posts: Vec<KnownPost>,
        media: Vec<(String, String)>,
    ) -> Self {
        let mut ctx = Self {
            scope,
            models: HashMap::with_capacity(models.len()),
            thumbnails: HashMap::with_capacity(models.len()),
            posts: HashMap::with_capacity(posts.len()),
            media: media.into_iter().map(|(id, key)| (key, id)).collect(),
            seen_models: HashSet::new(),
            seen_posts: HashSet::new(),
            seen_media: HashSet::new(),
            seen_thumbnails: HashSet::new(),
            thumbnail_candidates: HashMap::new(),
            with_icon: HashSet::new(),
            with_banner: HashSet::new(),
            seen_icons: HashSet::new(),
            seen_banners: HashSet::new(),
            enumeration: Enumeration::InProgress,
            stats: SyncStats::default(),
        };

        for model in models {
            ctx.remember_stored_model(model);
        }
        for post in posts {
            ctx.remember_post(post);
        }
        ctx
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn in_scope(&self, model_name: &str) -> bool {
        self.scope.as_deref().is_none_or(|folder| folder == model_name)
    }

    pub fn model_id(&self, folder_name: &str) -> Option<&str> {
        self.models.get(folder_name).map(String::as_str)
    }

    pub fn post_id(&self, model_id: &str, post_folder: &str) -> Option<&str> {
        self.posts
            .get(&(model_id.to_string(), post_folder.to_string()))
            .map(String::as_str)
    }

    pub fn knows_media(&self, object_key: &str) -> bool {
        self.media.contains_key(object_key)
    }

    pub fn remember_model(&mut self, folder_name: String, id: String, thumbnail: Option<String>) {
        self.thumbnails.insert(id.clone(), thumbnail);
        self.models.insert(folder_name, id);
    }

    /// Remembers a model row read back from the database, profile fields included
    pub fn remember_stored_model(&mut self, model: staged_models::Model) {
        if model.icon_url.is_some() {
            self.with_icon.insert(model.id.clone());
        }
        if model.banner_url.is_some() {
            self.with_banner.insert(model.id.clone());
        }
        self.remember_model(model.folder_name, model.id, model.thumbnail_key);
    }

    pub fn remember_post(&mut self, post: KnownPost) {
        self.posts.insert((post.model_id, post.folder_name), post.id);
    }

    pub fn mark_model_seen(&mut self, folder_name: &str) {
        if !self.seen_models.contains(folder_name) {
            self.seen_models.insert(folder_name.to_string());
        }
    }

    pub fn mark_post_seen(&mut self, model_id: &str, post_folder: &str) {
        self.seen_posts
            .insert((model_id.to_string(), post_folder.to_string()));
    }

    /// Returns `false` when the key was already seen earlier in this pass
    pub fn mark_media_seen(&mut self, object_key: &str) -> bool {
        self.seen_media.insert(object_key.to_string())
    }

    pub fn offer_thumbnail(&mut self, model_id: &str, object_key: &str) {
        self.seen_thumbnails.insert(object_key.to_string());
        self.thumbnail_candidates
            .entry(model_id.to_string())
            .or_insert_with(|| object_key.to_string());
    }

    /// Records a listed `profile/` file. Only the icon and banner names count.
    pub fn mark_profile_seen(&mut self, model_id: &str, file_name: &str) {
        match file_name {
            PROFILE_ICON => self.seen_icons.insert(model_id.to_string()),
            PROFILE_BANNER => self.seen_banners.insert(model_id.to_string()),
            _ => false,
        };
    }

    pub fn complete(&mut self) {
        self.enumeration = Enumeration::Complete;
    }

    fn ensure_complete(&self) -> SyncResult<()> {
        match self.enumeration {
            Enumeration::Complete => Ok(()),
            Enumeration::InProgress => Err(SyncError::IncompleteEnumeration),
        }
    }

    /// Ids of media rows known before the pass whose key was never listed
    pub fn stale_media(&self) -> SyncResult<Vec<String>> {
        self.ensure_complete()?;
        let mut ids: Vec<String> = self
            .media
            .iter()
            .filter(|(key, _)| !self.seen_media.contains(*key))
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn stale_posts(&self) -> SyncResult<Vec<String>> {
        self.ensure_complete()?;
        let mut ids: Vec<String> = self
            .posts
            .iter()
            .filter(|(key, _)| !self.seen_posts.contains(*key))
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Always empty for a scoped pass: the requested model survives even
    /// when its folder is empty.
    pub fn stale_models(&self) -> SyncResult<Vec<String>> {
        self.ensure_complete()?;
        if self.scope.is_some() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = self
            .models
            .iter()
            .filter(|(folder, _)| !self.seen_models.contains(*folder))
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// `(model id, key)` pairs whose stored thumbnail must change. A listed
    /// current thumbnail is kept. An unlisted one is replaced by the first
    /// listed top-level image, or cleared (`None`) when there is none.
    pub fn thumbnail_updates(&self) -> SyncResult<Vec<(String, Option<String>)>> {
        let stale: HashSet<String> = self.stale_models()?.into_iter().collect();
        let mut updates: Vec<(String, Option<String>)> = self
            .thumbnails
            .iter()
            .filter(|(model_id, _)| !stale.contains(*model_id))
            .filter_map(|(model_id, current)| {
                let candidate = self.thumbnail_candidates.get(model_id);
                let update = match (current, candidate) {
                    (Some(current), _) if self.seen_thumbnails.contains(current) => return None,
                    (_, Some(candidate)) => Some(candidate.clone()),
                    (Some(_), None) => None,
                    (None, None) => return None,
                };
                Some((model_id.clone(), update))
            })
            .collect();
        updates.sort();
        Ok(updates)
    }

    /// Models whose stored icon or banner url points at a `profile/` file
    /// the completed walk did not list.
    pub fn profile_clears(&self) -> SyncResult<Vec<(String, ProfileClear)>> {
        let stale: HashSet<String> = self.stale_models()?.into_iter().collect();
        let mut clears: Vec<(String, ProfileClear)> = self
            .with_icon
            .union(&self.with_banner)
            .filter(|model_id| !stale.contains(*model_id))
            .map(|model_id| {
                let clear = ProfileClear {
                    icon: self.with_icon.contains(model_id) && !self.seen_icons.contains(model_id),
                    banner: self.with_banner.contains(model_id)
                        && !self.seen_banners.contains(model_id),
                };
                (model_id.clone(), clear)
            })
            .filter(|(_, clear)| !clear.is_empty())
            .collect();
        clears.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(clears)
    }
}
