use crate::services::share_service::ShareService;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Runs the expiration sweep on a fixed interval until shutdown
pub struct BackgroundWorker {
    shares: Arc<ShareService>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(shares: Arc<ShareService>, shutdown: watch::Receiver<bool>) -> Self {
        let interval = Duration::from_secs(shares.config().sweep_interval_secs.max(1));
        Self {
            shares,
            interval,
            shutdown,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Background worker started (sweep every {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    async fn perform_cleanup(&self) {
        tracing::info!("🧹 Running expiration sweep...");

        match self.shares.sweep_expired(Utc::now()).await {
            Ok(report) if report.expired_found == 0 => {
                tracing::info!("✅ Sweep completed, nothing expired");
            }
            Ok(report) => {
                tracing::info!(
                    "✅ Sweep completed: {} records deleted, {} blob failures",
                    report.records_deleted,
                    report.blob_failures
                );
            }
            Err(e) => tracing::error!("Sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShareConfig;
    use crate::models::{ShareRecord, storage_path_for};
    use crate::services::memory::{InMemoryBlobStore, InMemoryMetadataStore};
    use crate::services::metadata_store::MetadataStore;
    use crate::services::notifier::NoopNotifier;

    #[tokio::test]
    async fn test_worker_sweeps_and_stops() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let now = Utc::now();
        let path = storage_path_for("old", "a.txt");
        metadata
            .create(&ShareRecord {
                id: "old".to_string(),
                filename: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size_bytes: 1,
                storage_path: path.clone(),
                created_at: now - chrono::Duration::hours(2),
                expires_at: now - chrono::Duration::hours(1),
                one_time_consume: false,
                consumed: false,
                delete_after_send: false,
                owner_email: None,
                password_hash: None,
            })
            .await
            .unwrap();
        blobs.put(&path, &b"x"[..]);

        let shares = Arc::new(ShareService::new(
            metadata.clone(),
            blobs.clone(),
            Arc::new(NoopNotifier),
            ShareConfig::development(),
        ));
        let (tx, rx) = watch::channel(false);
        let worker = BackgroundWorker::new(shares, rx).with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(worker.run());

        for _ in 0..100 {
            if metadata.is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(metadata.is_empty());
        assert!(!blobs.contains(&path));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
