use std::env;

/// Reconciliation and promotion settings
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Keys requested per bucket listing call (default: 1000)
    pub list_page_size: i32,

    /// Rows per multi-row INSERT statement (default: 500)
    pub insert_chunk_size: usize,

    /// Lifetime of signed URLs handed to the production catalog (default: 1 hour)
    pub signed_url_ttl_secs: u64,

    /// Base URL used for the cached `url` column of staged media.
    /// When unset the object key is stored as a relative path.
    pub public_base_url: Option<String>,

    /// Interval between full syncs in worker mode (default: 1 hour)
    pub sync_interval_secs: u64,

    /// Run a full sync as soon as the worker starts (default: true)
    pub sync_on_start: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_page_size: 1000,
            insert_chunk_size: 500,
            signed_url_ttl_secs: 3600,
            public_base_url: None,
            sync_interval_secs: 3600,
            sync_on_start: true,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            list_page_size: env::var("LIST_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i32| (1..=1000).contains(v))
                .unwrap_or(default.list_page_size),

            insert_chunk_size: env::var("INSERT_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.insert_chunk_size),

            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.signed_url_ttl_secs),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),

            sync_interval_secs: env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sync_interval_secs),

            sync_on_start: env::var("SYNC_ON_START")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.sync_on_start),
        }
    }

    /// Small pages and chunks so local runs exercise pagination
    pub fn development() -> Self {
        Self {
            list_page_size: 100,
            insert_chunk_size: 50,
            signed_url_ttl_secs: 600,
            public_base_url: Some("http://127.0.0.1:9000/catalog".to_string()),
            sync_interval_secs: 300,
            sync_on_start: true,
        }
    }

    /// Create config for production (full-size pages, hourly syncs)
    pub fn production() -> Self {
        let default = Self::default();
        Self {
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.signed_url_ttl_secs),
            ..default
        }
    }
}
