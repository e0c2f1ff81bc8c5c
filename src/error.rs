use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Object storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Invalid model folder: {0}")]
    InvalidScope(String),

    #[error("Refusing to sweep: bucket enumeration did not complete")]
    IncompleteEnumeration,

    #[error("Listing for prefix {0:?} was truncated without a continuation token")]
    BrokenPagination(Option<String>),
}

pub type SyncResult<T> = Result<T, SyncError>;
