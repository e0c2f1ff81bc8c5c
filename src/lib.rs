pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{SyncError, SyncResult};
pub use models::{ActivationStats, ActivationTarget, SyncStats};
pub use services::catalog::CatalogService;
