pub use super::production_models::Entity as ProductionModels;
pub use super::production_posts::Entity as ProductionPosts;
pub use super::staged_media::Entity as StagedMedia;
pub use super::staged_models::Entity as StagedModels;
pub use super::staged_posts::Entity as StagedPosts;
pub use super::sync_runs::Entity as SyncRuns;
