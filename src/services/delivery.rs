use crate::models::{DeliveryMode, ShareRecord};
use bytes::Bytes;
use tokio::task::JoinHandle;

/// What a successful consumption hands back to the transport layer
#[derive(Debug)]
pub enum Delivery {
    /// Send the client to a signed, time-bounded download URL
    Redirect {
        url: String,
        filename: String,
        mime_type: String,
    },
    /// Bytes read through the service. The blob and record are being purged
    /// in the background; `purge` completes once both deletes have run.
    Inline {
        content: Bytes,
        filename: String,
        mime_type: String,
        purge: Option<JoinHandle<()>>,
    },
}

impl Delivery {
    pub fn filename(&self) -> &str {
        match self {
            Delivery::Redirect { filename, .. } | Delivery::Inline { filename, .. } => filename,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Delivery::Redirect { mime_type, .. } | Delivery::Inline { mime_type, .. } => mime_type,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self {
            Delivery::Redirect { .. } => DeliveryMode::Redirect,
            Delivery::Inline { .. } => DeliveryMode::Proxied,
        }
    }

    /// Waits for a pending background purge, if any
    pub async fn settle(&mut self) {
        if let Delivery::Inline { purge, .. } = self {
            if let Some(handle) = purge.take() {
                if let Err(e) = handle.await {
                    tracing::error!("Purge task failed: {}", e);
                }
            }
        }
    }
}

/// Picks how `record` is delivered
pub fn select_strategy(record: &ShareRecord) -> DeliveryMode {
    record.delivery_mode()
}

/// Whether a delivery must win the one-time conditional update
pub fn requires_consumption_claim(record: &ShareRecord) -> bool {
    record.one_time_consume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::storage_path_for;
    use chrono::Utc;

    #[test]
    fn test_flags_are_independent() {
        let now = Utc::now();
        let mut r = ShareRecord {
            id: "id".to_string(),
            filename: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: 1,
            storage_path: storage_path_for("id", "a.txt"),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
            one_time_consume: false,
            consumed: false,
            delete_after_send: true,
            owner_email: None,
            password_hash: None,
        };
        assert_eq!(select_strategy(&r), DeliveryMode::Proxied);
        assert!(!requires_consumption_claim(&r));

        r.one_time_consume = true;
        r.delete_after_send = false;
        assert_eq!(select_strategy(&r), DeliveryMode::Redirect);
        assert!(requires_consumption_claim(&r));
    }

    #[tokio::test]
    async fn test_settle_awaits_purge() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut delivery = Delivery::Inline {
            content: Bytes::from_static(b"x"),
            filename: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            purge: Some(tokio::spawn(async move {
                let _ = tx.send(());
            })),
        };
        delivery.settle().await;
        assert!(rx.await.is_ok());
        assert_eq!(delivery.mode(), DeliveryMode::Proxied);
        assert_eq!(delivery.filename(), "a.txt");
    }
}
