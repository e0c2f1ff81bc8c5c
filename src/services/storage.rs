use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;

/// One page of a continuation-token listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Lists one page of keys under `prefix` (whole bucket when `None`).
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListPage>;

    /// Top-level folder names, i.e. the common prefixes of a `/`-delimited listing.
    async fn list_model_folders(&self) -> Result<Vec<String>>;
}

/// Issues temporary read URLs. Implementations never fail: an empty string
/// means "render without this object".
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn sign(&self, key: &str, ttl_secs: u64) -> String;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String> {
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl_secs))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await?;
        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation_token: Option<String>,
        max_keys: i32,
    ) -> Result<ListPage> {
        let res = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .set_continuation_token(continuation_token)
            .max_keys(max_keys)
            .send()
            .await?;

        let keys = res
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();

        Ok(ListPage {
            keys,
            is_truncated: res.is_truncated.unwrap_or(false),
            next_token: res.next_continuation_token,
        })
    }

    async fn list_model_folders(&self) -> Result<Vec<String>> {
        let mut folders = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .delimiter("/")
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            for prefix in res.common_prefixes.unwrap_or_default() {
                if let Some(name) = prefix.prefix {
                    let name = name.trim_end_matches('/');
                    if !name.is_empty() {
                        folders.push(name.to_string());
                    }
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
                if continuation_token.is_none() {
                    anyhow::bail!("truncated folder listing without continuation token");
                }
            } else {
                break;
            }
        }

        folders.sort();
        folders.dedup();
        Ok(folders)
    }
}

#[async_trait]
impl UrlSigner for S3StorageService {
    async fn sign(&self, key: &str, ttl_secs: u64) -> String {
        if key.is_empty() {
            return String::new();
        }
        match self.presign(key, ttl_secs).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Failed to sign URL for {}: {:?}", key, e);
                String::new()
            }
        }
    }
}
