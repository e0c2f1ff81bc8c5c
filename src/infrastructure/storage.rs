use crate::services::storage::S3StorageService;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage() -> anyhow::Result<Arc<S3StorageService>> {
    // Setup S3 client
    let endpoint_url = env::var("MINIO_ENDPOINT")
        .map_err(|_| anyhow::anyhow!("MINIO_ENDPOINT must be set"))?;
    let access_key = env::var("MINIO_ACCESS_KEY")
        .map_err(|_| anyhow::anyhow!("MINIO_ACCESS_KEY must be set"))?;
    let secret_key = env::var("MINIO_SECRET_KEY")
        .map_err(|_| anyhow::anyhow!("MINIO_SECRET_KEY must be set"))?;
    let bucket =
        env::var("MINIO_BUCKET").map_err(|_| anyhow::anyhow!("MINIO_BUCKET must be set"))?;
    let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(region))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // The catalog bucket is read-only for us; a missing bucket is a configuration error.
    s3_client
        .head_bucket()
        .bucket(&bucket)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Bucket '{}' is not reachable: {}", bucket, e))?;
    info!("✅ Bucket '{}' is ready", bucket);

    Ok(Arc::new(S3StorageService::new(s3_client, bucket)))
}
