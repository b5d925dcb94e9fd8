use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A share link and the metadata of the content it points at.
///
/// A record never represents the "deleted" state: once the metadata row is
/// gone, the share is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub one_time_consume: bool,
    pub consumed: bool,
    pub delete_after_send: bool,
    pub owner_email: Option<String>,
    pub password_hash: Option<String>,
}

impl ShareRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// A one-time record that has already been delivered
    pub fn is_spent(&self) -> bool {
        self.one_time_consume && self.consumed
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.delete_after_send {
            DeliveryMode::Proxied
        } else {
            DeliveryMode::Redirect
        }
    }
}

/// Blob key for a share. Unique per record because `id` is.
pub fn storage_path_for(id: &str, filename: &str) -> String {
    format!("uploads/{}/{}", id, filename)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Client is redirected to a signed download URL
    Redirect,
    /// Content is streamed through the service, then purged
    Proxied,
}

/// Row selected by an expiry scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredShare {
    pub id: String,
    pub storage_path: String,
}

/// Guard evaluated atomically by `MetadataStore::conditional_update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// `consumed = false`
    Unconsumed,
}

impl Precondition {
    pub fn holds(&self, record: &ShareRecord) -> bool {
        match self {
            Precondition::Unconsumed => !record.consumed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPatch {
    /// `consumed = true`
    MarkConsumed,
}

impl RecordPatch {
    pub fn apply(&self, record: &mut ShareRecord) {
        match self {
            RecordPatch::MarkConsumed => record.consumed = true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalUpdate {
    Matched(ShareRecord),
    NotMatched,
}

impl ConditionalUpdate {
    pub fn matched(&self) -> bool {
        matches!(self, ConditionalUpdate::Matched(_))
    }
}

/// Input to `ShareService::request_upload`
#[derive(Debug, Clone)]
pub struct NewShare {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub ttl: chrono::Duration,
    pub one_time_consume: bool,
    pub delete_after_send: bool,
    pub owner_email: Option<String>,
    pub password: Option<String>,
}

/// Signed, time-limited upload location handed back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UploadTarget {
    pub url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadTicket {
    pub id: String,
    pub storage_path: String,
    pub expires_at: DateTime<Utc>,
    pub upload_target: UploadTarget,
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Records found past expiry by this pass
    pub expired_found: usize,
    /// Metadata rows this pass actually removed
    pub records_deleted: u64,
    /// Blob deletions that failed and were left behind
    pub blob_failures: usize,
    pub expired_ids: Vec<String>,
}

/// Public, side-effect-free view of a share
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareStatus {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub is_consumed: bool,
    pub one_time_consume: bool,
    pub delete_after_send: bool,
    pub requires_password: bool,
    pub delivery_mode: DeliveryMode,
    pub uploaded: bool,
}
