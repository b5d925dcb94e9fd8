use crate::config::ShareConfig;
use crate::services::memory::InMemoryBlobStore;
use crate::services::storage::{BlobStore, S3BlobStore};
use anyhow::Context;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

/// Blob store selected by `BLOB_BACKEND`
pub async fn setup_storage(config: &ShareConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.blob_backend.as_str() {
        "memory" => {
            warn!("⚠️ Using in-memory blob storage, uploads are lost on restart");
            Ok(Arc::new(InMemoryBlobStore::new()))
        }
        "s3" => Ok(Arc::new(setup_s3().await?)),
        other => anyhow::bail!("Unknown BLOB_BACKEND: {}", other),
    }
}

async fn setup_s3() -> anyhow::Result<S3BlobStore> {
    let endpoint_url = env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT must be set")?;
    let access_key = env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY must be set")?;
    let secret_key = env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY must be set")?;
    let bucket = env::var("MINIO_BUCKET").context("MINIO_BUCKET must be set")?;
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

    // Ensure bucket exists
    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = s3_client.create_bucket().bucket(&bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
    }

    Ok(S3BlobStore::new(s3_client, bucket))
}
