use super::ReconciliationEngine;
use super::context::SyncContext;
use crate::error::SyncResult;
use crate::services::catalog_repository::{NewMedia, NewModel, NewPost, ProfileUpdate};
use crate::services::key_parser::{self, PROFILE_BANNER, PROFILE_ICON, ParsedKey};
use crate::utils::object_url::public_object_url;
use std::collections::{HashMap, HashSet};
use tracing::debug;

impl ReconciliationEngine {
    /// Applies one listing page: models, then posts, then media. Each pass
    /// relies on the ids the previous one resolved.
    pub(super) async fn apply_page(&self, ctx: &mut SyncContext, keys: &[String]) -> SyncResult<()> {
        let parsed: Vec<(&str, ParsedKey<'_>)> = keys
            .iter()
            .map(|key| (key.as_str(), key_parser::parse(key)))
            .filter(|(_, parsed)| parsed.model_name().is_some_and(|name| ctx.in_scope(name)))
            .collect();

        self.model_pass(ctx, &parsed).await?;
        self.post_pass(ctx, &parsed).await?;
        self.media_pass(ctx, &parsed).await?;
        Ok(())
    }

    async fn model_pass(&self, ctx: &mut SyncContext, parsed: &[(&str, ParsedKey<'_>)]) -> SyncResult<()> {
        let mut staged: Vec<NewModel> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for (key, entry) in parsed {
            let Some(model_name) = entry.model_name() else {
                continue;
            };
            ctx.mark_model_seen(model_name);
            if ctx.model_id(model_name).is_some() {
                continue;
            }

            let slot = *index.entry(model_name).or_insert_with(|| {
                staged.push(NewModel {
                    folder_name: model_name.to_string(),
                    thumbnail_key: None,
                });
                staged.len() - 1
            });
            if matches!(entry, ParsedKey::Model { .. }) && staged[slot].thumbnail_key.is_none() {
                staged[slot].thumbnail_key = Some(key.to_string());
            }
        }

        if staged.is_empty() {
            return Ok(());
        }

        let inserted = self.repo.insert_models(&staged).await?;
        ctx.stats.models += inserted.len() as u64;
        let created: HashMap<&str, &str> = inserted
            .iter()
            .map(|(folder, id)| (folder.as_str(), id.as_str()))
            .collect();

        for record in &staged {
            match created.get(record.folder_name.as_str()) {
                Some(id) => ctx.remember_model(
                    record.folder_name.clone(),
                    id.to_string(),
                    record.thumbnail_key.clone(),
                ),
                // inserted by someone else between our load and insert
                None => {
                    if let Some(model) = self.repo.find_model(&record.folder_name).await? {
                        ctx.remember_stored_model(model);
                    }
                }
            }
        }

        debug!("Staged {} new models ({} created)", staged.len(), inserted.len());
        Ok(())
    }

    async fn post_pass(&self, ctx: &mut SyncContext, parsed: &[(&str, ParsedKey<'_>)]) -> SyncResult<()> {
        let mut staged: Vec<NewPost> = Vec::new();
        let mut pending: HashSet<(String, String)> = HashSet::new();

        for (_, entry) in parsed {
            let ParsedKey::Media {
                model_name,
                post_name,
                ..
            } = entry
            else {
                continue;
            };
            let Some(model_id) = ctx.model_id(model_name).map(str::to_string) else {
                continue;
            };

            ctx.mark_post_seen(&model_id, post_name);
            if ctx.post_id(&model_id, post_name).is_some() {
                continue;
            }
            if pending.insert((model_id.clone(), post_name.to_string())) {
                staged.push(NewPost {
                    model_id,
                    folder_name: post_name.to_string(),
                });
            }
        }

        if staged.is_empty() {
            return Ok(());
        }

        let inserted = self.repo.insert_posts(&staged).await?;
        ctx.stats.posts += inserted.len() as u64;
        for post in inserted {
            ctx.remember_post(post);
        }

        let unresolved: HashSet<&str> = staged
            .iter()
            .filter(|record| ctx.post_id(&record.model_id, &record.folder_name).is_none())
            .map(|record| record.model_id.as_str())
            .collect();
        for model_id in unresolved {
            for post in self.repo.load_posts(Some(model_id)).await? {
                if ctx.post_id(&post.model_id, &post.folder_name).is_none() {
                    ctx.remember_post(post);
                }
            }
        }

        Ok(())
    }

    async fn media_pass(&self, ctx: &mut SyncContext, parsed: &[(&str, ParsedKey<'_>)]) -> SyncResult<()> {
        let base = self.config.public_base_url.as_deref();
        let mut profiles: HashMap<String, ProfileUpdate> = HashMap::new();
        let mut rows: Vec<NewMedia> = Vec::new();

        for (key, entry) in parsed {
            match entry {
                ParsedKey::Model { model_name, .. } => {
                    if let Some(model_id) = ctx.model_id(model_name).map(str::to_string) {
                        ctx.offer_thumbnail(&model_id, key);
                    }
                }
                ParsedKey::ProfileMedia {
                    model_name,
                    file_name,
                } => {
                    let Some(model_id) = ctx.model_id(model_name).map(str::to_string) else {
                        continue;
                    };
                    ctx.mark_profile_seen(&model_id, file_name);
                    let profile = profiles.entry(model_id).or_default();
                    match *file_name {
                        PROFILE_ICON => profile.icon_url = Some(public_object_url(base, key)),
                        PROFILE_BANNER => profile.banner_url = Some(public_object_url(base, key)),
                        _ => {}
                    }
                }
                ParsedKey::Media {
                    model_name,
                    post_name,
                    kind,
                    ..
                } => {
                    let Some(post_id) = ctx
                        .model_id(model_name)
                        .and_then(|model_id| ctx.post_id(model_id, post_name))
                        .map(str::to_string)
                    else {
                        continue;
                    };
                    if !ctx.mark_media_seen(key) {
                        continue;
                    }

                    if ctx.knows_media(key) {
                        ctx.stats.media_updated += 1;
                    } else {
                        ctx.stats.media += 1;
                    }
                    rows.push(NewMedia {
                        post_id,
                        object_key: key.to_string(),
                        kind: *kind,
                        url: public_object_url(base, key),
                    });
                }
                ParsedKey::Unknown => {}
            }
        }

        for (model_id, profile) in profiles {
            self.repo.update_model_profile(&model_id, profile).await?;
        }

        if !rows.is_empty() {
            self.repo.insert_media(&rows).await?;
        }
        Ok(())
    }
}
