pub mod prelude;

pub mod staged_media;
pub mod staged_models;
pub mod staged_posts;

pub mod production_models;
pub mod production_posts;

pub mod sync_runs;
