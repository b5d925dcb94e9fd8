use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::time::Duration;

/// S3 `DeleteObjects` accepts at most this many keys per request
const DELETE_BATCH_SIZE: usize = 1000;

/// Per-key outcome of a bulk delete. Missing keys count as deleted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Signed URL the client can PUT bytes to
    async fn create_upload_capability(&self, key: &str, expires_in: Duration) -> Result<String>;
    /// Signed URL that downloads `key` as an attachment named `filename`
    async fn create_download_capability(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String>;
    async fn read_all(&self, key: &str) -> Result<Bytes>;
    async fn exists(&self, key: &str) -> Result<bool>;
    /// Deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<()>;
    /// Best-effort: per-key failures land in the report instead of an `Err`
    async fn delete_many(&self, keys: &[String]) -> Result<BulkDeleteReport>;
}

/// Content-Disposition for a download, ASCII fallback plus RFC 5987 name
pub fn attachment_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file".to_string()
    } else {
        ascii_filename
    };
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn presigning(expires_in: Duration) -> Result<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| anyhow!("Failed to create presigning config: {}", e))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn create_upload_capability(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| anyhow!("Failed to generate presigned PUT URL: {}", e))?;
        Ok(presigned.uri().to_string())
    }

    async fn create_download_capability(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(attachment_disposition(filename))
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| anyhow!("Failed to generate presigned GET URL: {}", e))?;
        Ok(presigned.uri().to_string())
    }

    async fn read_all(&self, key: &str) -> Result<Bytes> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let data = res.body.collect().await?.into_bytes();
        Ok(data)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!(service_error))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<BulkDeleteReport> {
        let mut report = BulkDeleteReport::default();

        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<Result<Vec<_>, _>>()?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()?;

            let res = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await;

            match res {
                Ok(output) => {
                    let errors = output.errors();
                    for key in chunk {
                        match errors.iter().find(|e| e.key() == Some(key.as_str())) {
                            Some(err) => report.failed.push((
                                key.clone(),
                                err.message().unwrap_or("unknown error").to_string(),
                            )),
                            None => report.deleted.push(key.clone()),
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "S3 delete_objects failed for {} keys in bucket {}: {:?}",
                        chunk.len(),
                        self.bucket,
                        e
                    );
                    let reason = e.to_string();
                    report
                        .failed
                        .extend(chunk.iter().map(|k| (k.clone(), reason.clone())));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("a.txt"),
            "attachment; filename=\"a.txt\"; filename*=UTF-8''a%2Etxt"
        );
        let unicode = attachment_disposition("测试.txt");
        assert!(unicode.starts_with("attachment; filename=\".txt\""));
        assert!(unicode.contains("%E6%B5%8B"));
        assert!(attachment_disposition("测试").contains("filename=\"file\""));
    }
}
