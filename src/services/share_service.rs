use crate::api::error::AppError;
use crate::config::ShareConfig;
use crate::models::{
    ConditionalUpdate, DeliveryMode, NewShare, Precondition, RecordPatch, ShareRecord,
    ShareStatus, SweepReport, UploadTarget, UploadTicket, storage_path_for,
};
use crate::services::access;
use crate::services::delivery::{Delivery, requires_consumption_claim, select_strategy};
use crate::services::metadata_store::MetadataStore;
use crate::services::notifier::{LinkMessage, Notifier};
use crate::services::storage::BlobStore;
use crate::utils::password::hash_password;
use crate::utils::validation::{
    sanitize_filename, validate_file_size, validate_mime_type, validate_share_id, validate_ttl,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle of share links: issuance, consumption, deletion and expiry.
///
/// Holds no state of its own between calls. Every store call is bounded by
/// `ShareConfig::store_timeout`.
#[derive(Clone)]
pub struct ShareService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
    config: ShareConfig,
}

impl ShareService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        config: ShareConfig,
    ) -> Self {
        Self {
            metadata,
            blobs,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Validates the request, persists the record and returns a signed
    /// upload target. The record is written before the upload URL is
    /// requested, so a signing failure leaves a valid (empty) share behind.
    pub async fn request_upload(&self, new: NewShare) -> Result<UploadTicket, AppError> {
        validate_file_size(new.size_bytes, self.config.max_file_size)?;
        validate_ttl(new.ttl, self.config.max_ttl_hours)?;
        let filename = sanitize_filename(&new.filename)?;
        let mime_type = validate_mime_type(&new.mime_type)?;

        let password_hash = match new.password.as_deref() {
            Some(p) if !p.is_empty() => Some(
                hash_password(p, self.config.password_scheme)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?,
            ),
            _ => None,
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(new.ttl)
            .ok_or_else(|| AppError::BadRequest("Expiry is out of range".to_string()))?;
        let storage_path = storage_path_for(&id, &filename);

        let record = ShareRecord {
            id: id.clone(),
            filename,
            mime_type,
            size_bytes: new.size_bytes,
            storage_path: storage_path.clone(),
            created_at: now,
            expires_at,
            one_time_consume: new.one_time_consume,
            consumed: false,
            delete_after_send: new.delete_after_send,
            owner_email: new.owner_email.filter(|e| !e.trim().is_empty()),
            password_hash,
        };

        upstream("metadata create", self.bounded(self.metadata.create(&record))).await?;
        tracing::info!("📝 Share {} created, expires at {}", id, record.expires_at);

        let upload_ttl = self.config.upload_url_ttl();
        let url = upstream(
            "upload URL",
            self.bounded(self.blobs.create_upload_capability(&storage_path, upload_ttl)),
        )
        .await?;

        Ok(UploadTicket {
            id,
            storage_path,
            expires_at: record.expires_at,
            upload_target: UploadTarget {
                url,
                method: "PUT".to_string(),
                expires_at: now + chrono::Duration::seconds(upload_ttl.as_secs() as i64),
            },
        })
    }

    /// Side-effect free access check
    pub async fn evaluate_access(
        &self,
        id: &str,
        password: Option<&str>,
    ) -> Result<ShareRecord, AppError> {
        let record = self.fetch(id).await?;
        access::evaluate(record, password, Utc::now())
    }

    /// Releases the share to the caller, either as a signed redirect or as
    /// bytes read through the service.
    pub async fn consume(&self, id: &str, password: Option<&str>) -> Result<Delivery, AppError> {
        let record = self.evaluate_access(id, password).await?;

        match select_strategy(&record) {
            DeliveryMode::Redirect => {
                let url = upstream(
                    "download URL",
                    self.bounded(self.blobs.create_download_capability(
                        &record.storage_path,
                        &record.filename,
                        self.config.download_url_ttl(),
                    )),
                )
                .await?;

                if requires_consumption_claim(&record) {
                    self.claim(&record.id).await?;
                }

                tracing::info!("⬇️ Share {} delivered by redirect", record.id);
                Ok(Delivery::Redirect {
                    url,
                    filename: record.filename,
                    mime_type: record.mime_type,
                })
            }
            DeliveryMode::Proxied => {
                let content = self
                    .bounded(self.blobs.read_all(&record.storage_path))
                    .await?
                    .map_err(|e| {
                        AppError::BlobDownloadFailed(format!("{}: {}", record.storage_path, e))
                    })?;

                if requires_consumption_claim(&record) {
                    self.claim(&record.id).await?;
                }

                let purge = tokio::spawn(purge_share(
                    self.metadata.clone(),
                    self.blobs.clone(),
                    self.config.store_timeout(),
                    record.id.clone(),
                    record.storage_path.clone(),
                ));

                tracing::info!(
                    "⬇️ Share {} delivered inline ({} bytes)",
                    record.id,
                    content.len()
                );
                Ok(Delivery::Inline {
                    content,
                    filename: record.filename,
                    mime_type: record.mime_type,
                    purge: Some(purge),
                })
            }
        }
    }

    /// Removes the blob, then the record. A blob failure aborts and keeps the
    /// record so the deletion can be retried.
    pub async fn delete_record(&self, id: &str) -> Result<(), AppError> {
        let record = self
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;

        upstream(
            "blob delete",
            self.bounded(self.blobs.delete(&record.storage_path)),
        )
        .await?;

        match self.bounded(self.metadata.delete(&record.id)).await {
            Ok(Ok(_)) => {
                tracing::info!("🗑️ Share {} deleted", record.id);
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::PartialFailure(format!(
                "blob {} deleted but record {} remains: {}",
                record.storage_path, record.id, e
            ))),
            Err(_) => Err(AppError::PartialFailure(format!(
                "blob {} deleted but removing record {} timed out",
                record.storage_path, record.id
            ))),
        }
    }

    /// Purges every record that expired before `now`. Blob deletion is
    /// best-effort; metadata rows are removed regardless. If blobs went but
    /// the rows could not, the result is `PartialFailure`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let expired = upstream(
            "expiry query",
            self.bounded(self.metadata.query_expired(now)),
        )
        .await?;

        if expired.is_empty() {
            tracing::debug!("No expired shares");
            return Ok(SweepReport::default());
        }

        let (ids, paths): (Vec<String>, Vec<String>) = expired
            .into_iter()
            .map(|e| (e.id, e.storage_path))
            .unzip();

        let blob_failures = match self.bounded(self.blobs.delete_many(&paths)).await {
            Ok(Ok(report)) => {
                for (path, reason) in &report.failed {
                    tracing::warn!("Orphaned blob {} left by sweep: {}", path, reason);
                }
                report.failed.len()
            }
            Ok(Err(e)) => {
                tracing::error!("Bulk blob delete failed for {} paths: {}", paths.len(), e);
                paths.len()
            }
            Err(_) => paths.len(),
        };

        let records_deleted = match self.bounded(self.metadata.delete_many(&ids)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if blob_failures < paths.len() => {
                tracing::error!("Sweep removed blobs but not records {:?}: {}", ids, e);
                return Err(AppError::PartialFailure(format!(
                    "blobs deleted but records {} remain: {}",
                    ids.join(", "),
                    e
                )));
            }
            Err(_) if blob_failures < paths.len() => {
                tracing::error!("Sweep removed blobs but deleting records {:?} timed out", ids);
                return Err(AppError::PartialFailure(format!(
                    "blobs deleted but removing records {} timed out",
                    ids.join(", ")
                )));
            }
            Ok(Err(e)) => {
                return Err(AppError::UpstreamUnavailable(format!(
                    "metadata bulk delete failed: {}",
                    e
                )));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "🧹 Sweep removed {} of {} expired shares ({} blob failures)",
            records_deleted,
            ids.len(),
            blob_failures
        );

        Ok(SweepReport {
            expired_found: ids.len(),
            records_deleted,
            blob_failures,
            expired_ids: ids,
        })
    }

    /// Public status of a share. Never changes state and needs no password.
    pub async fn describe(&self, id: &str) -> Result<ShareStatus, AppError> {
        let record = self
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;

        let uploaded = upstream(
            "blob exists",
            self.bounded(self.blobs.exists(&record.storage_path)),
        )
        .await?;

        Ok(ShareStatus {
            is_expired: record.is_expired(Utc::now()),
            is_consumed: record.is_spent(),
            requires_password: record.requires_password(),
            delivery_mode: record.delivery_mode(),
            uploaded,
            id: record.id,
            filename: record.filename,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
            expires_at: record.expires_at,
            one_time_consume: record.one_time_consume,
            delete_after_send: record.delete_after_send,
        })
    }

    /// Emails the public link to `email`, falling back to the owner address.
    /// Returns the address the link was sent to.
    pub async fn send_link(&self, id: &str, email: Option<&str>) -> Result<String, AppError> {
        let record = access::evaluate_availability(self.fetch(id).await?, Utc::now())?;

        let to = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .or_else(|| record.owner_email.clone())
            .ok_or_else(|| AppError::BadRequest("No recipient email address".to_string()))?;

        let message = LinkMessage {
            to: to.clone(),
            link: format!("{}/download/{}", self.config.app_url, record.id),
            filename: record.filename,
            expires_at: record.expires_at,
            one_time: record.one_time_consume,
        };

        upstream("notifier", self.bounded(self.notifier.send_link(&message))).await?;
        Ok(to)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        upstream("metadata ping", self.bounded(self.metadata.ping())).await
    }

    /// Malformed ids are rejected here, before either store is contacted
    async fn fetch(&self, id: &str) -> Result<Option<ShareRecord>, AppError> {
        let id = validate_share_id(id)?;
        upstream("metadata get", self.bounded(self.metadata.get(&id))).await
    }

    /// Wins or loses the one-time race for `id`
    async fn claim(&self, id: &str) -> Result<ShareRecord, AppError> {
        let outcome = upstream(
            "consume update",
            self.bounded(self.metadata.conditional_update(
                id,
                Precondition::Unconsumed,
                RecordPatch::MarkConsumed,
            )),
        )
        .await?;

        match outcome {
            ConditionalUpdate::Matched(record) => Ok(record),
            ConditionalUpdate::NotMatched => {
                tracing::warn!("Share {} lost the consumption race", id);
                Err(AppError::AlreadyConsumed)
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<anyhow::Result<T>, AppError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        with_timeout(self.config.store_timeout(), fut).await
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<anyhow::Result<T>, AppError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        tracing::error!("⏱️ Store call exceeded {:?}", limit);
        AppError::UpstreamUnavailable(format!("store call timed out after {:?}", limit))
    })
}

async fn upstream<T, F>(op: &str, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<anyhow::Result<T>, AppError>>,
{
    call.await?
        .map_err(|e| AppError::UpstreamUnavailable(format!("{} failed: {}", op, e)))
}

/// Deletes the blob, then the record, after an inline delivery. Failures are
/// logged only; the sweep picks up anything left behind once it expires.
async fn purge_share(
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    limit: Duration,
    id: String,
    storage_path: String,
) {
    match with_timeout(limit, blobs.delete(&storage_path)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Failed to purge blob {}: {}", storage_path, e),
        Err(_) => tracing::error!("Timed out purging blob {}", storage_path),
    }

    match with_timeout(limit, metadata.delete(&id)).await {
        Ok(Ok(_)) => tracing::info!("🔥 Share {} purged after delivery", id),
        Ok(Err(e)) => tracing::error!("Failed to purge record {}: {}", id, e),
        Err(_) => tracing::error!("Timed out purging record {}", id),
    }
}
