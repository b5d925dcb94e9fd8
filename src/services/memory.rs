//! Process-local stores backed by `DashMap`, selected with `BLOB_BACKEND=memory`
//! and used throughout the test suites.

use crate::models::{ConditionalUpdate, ExpiredShare, Precondition, RecordPatch, ShareRecord};
use crate::services::metadata_store::MetadataStore;
use crate::services::storage::{BlobStore, BulkDeleteReport};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    records: Arc<DashMap<String, ShareRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create(&self, record: &ShareRecord) -> Result<()> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(anyhow!("Duplicate share id: {}", record.id)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ShareRecord>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64> {
        Ok(ids
            .iter()
            .filter(|id| self.records.remove(id.as_str()).is_some())
            .count() as u64)
    }

    async fn query_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredShare>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.expires_at < now)
            .map(|r| ExpiredShare {
                id: r.id.clone(),
                storage_path: r.storage_path.clone(),
            })
            .collect())
    }

    async fn conditional_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: RecordPatch,
    ) -> Result<ConditionalUpdate> {
        // get_mut holds the shard write lock across check and apply
        match self.records.get_mut(id) {
            Some(mut record) if precondition.holds(&record) => {
                patch.apply(&mut record);
                Ok(ConditionalUpdate::Matched(record.clone()))
            }
            _ => Ok(ConditionalUpdate::NotMatched),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<DashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores bytes as if a client had used the signed upload URL
    pub fn put(&self, key: &str, data: impl Into<Bytes>) {
        self.objects.insert(key.to_string(), data.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn signed(action: &str, key: &str, expires_in: Duration) -> String {
        let expires_at = Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64);
        format!(
            "memory://{}/{}?expires={}",
            action,
            key,
            expires_at.timestamp()
        )
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_upload_capability(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(Self::signed("upload", key, expires_in))
    }

    async fn create_download_capability(
        &self,
        key: &str,
        _filename: &str,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(Self::signed("download", key, expires_in))
    }

    async fn read_all(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| anyhow!("Key not found: {}", key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<BulkDeleteReport> {
        for key in keys {
            self.objects.remove(key);
        }
        Ok(BulkDeleteReport {
            deleted: keys.to_vec(),
            failed: Vec::new(),
        })
    }
}
