use chrono::{Duration, Utc};
use ghost_share::infrastructure::database;
use ghost_share::models::{ConditionalUpdate, Precondition, RecordPatch, ShareRecord, storage_path_for};
use ghost_share::services::metadata_store::{MetadataStore, SeaOrmMetadataStore};
use sea_orm::Database;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_store() -> SeaOrmMetadataStore {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    SeaOrmMetadataStore::new(db)
}

fn record(expires_in: Duration, one_time: bool) -> ShareRecord {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    ShareRecord {
        storage_path: storage_path_for(&id, "a.txt"),
        id,
        filename: "a.txt".to_string(),
        mime_type: "text/plain".to_string(),
        size_bytes: 10,
        created_at: now - Duration::hours(3),
        expires_at: now + expires_in,
        one_time_consume: one_time,
        consumed: false,
        delete_after_send: false,
        owner_email: Some("owner@example.com".to_string()),
        password_hash: Some(format!("sha256${}", "ab".repeat(32))),
    }
}

#[tokio::test]
async fn test_create_and_get_roundtrip() {
    let store = setup_store().await;
    let r = record(Duration::hours(1), true);
    store.create(&r).await.unwrap();

    let loaded = store.get(&r.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, r.id);
    assert_eq!(loaded.storage_path, r.storage_path);
    assert_eq!(loaded.owner_email, r.owner_email);
    assert_eq!(loaded.password_hash, r.password_hash);
    assert_eq!(loaded.expires_at.timestamp(), r.expires_at.timestamp());
    assert!(!loaded.consumed);

    assert!(store.get(&Uuid::new_v4().to_string()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    let store = setup_store().await;
    let r = record(Duration::hours(1), false);
    store.create(&r).await.unwrap();
    assert!(store.create(&r).await.is_err());
}

#[tokio::test]
async fn test_conditional_update_matches_once() {
    let store = setup_store().await;
    let r = record(Duration::hours(1), true);
    store.create(&r).await.unwrap();

    let first = store
        .conditional_update(&r.id, Precondition::Unconsumed, RecordPatch::MarkConsumed)
        .await
        .unwrap();
    match first {
        ConditionalUpdate::Matched(updated) => assert!(updated.consumed),
        ConditionalUpdate::NotMatched => panic!("first update should match"),
    }

    let second = store
        .conditional_update(&r.id, Precondition::Unconsumed, RecordPatch::MarkConsumed)
        .await
        .unwrap();
    assert_eq!(second, ConditionalUpdate::NotMatched);

    let missing = store
        .conditional_update(
            &Uuid::new_v4().to_string(),
            Precondition::Unconsumed,
            RecordPatch::MarkConsumed,
        )
        .await
        .unwrap();
    assert!(!missing.matched());
}

#[tokio::test]
async fn test_matched_update_returns_patched_record() {
    let store = setup_store().await;
    let r = record(Duration::hours(1), true);
    store.create(&r).await.unwrap();

    let outcome = store
        .conditional_update(&r.id, Precondition::Unconsumed, RecordPatch::MarkConsumed)
        .await
        .unwrap();
    let ConditionalUpdate::Matched(updated) = outcome else {
        panic!("update should match");
    };
    assert!(updated.consumed);
    assert_eq!(updated.id, r.id);
    assert_eq!(updated.storage_path, r.storage_path);
    assert_eq!(updated.password_hash, r.password_hash);
    assert!(store.get(&r.id).await.unwrap().unwrap().consumed);

    // A row deleted before the update is not a match
    store.delete(&r.id).await.unwrap();
    let gone = store
        .conditional_update(&r.id, Precondition::Unconsumed, RecordPatch::MarkConsumed)
        .await
        .unwrap();
    assert_eq!(gone, ConditionalUpdate::NotMatched);
}

#[tokio::test]
async fn test_concurrent_conditional_updates_have_one_winner() {
    let store = Arc::new(setup_store().await);
    let r = record(Duration::hours(1), true);
    store.create(&r).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let id = r.id.clone();
        tasks.push(tokio::spawn(async move {
            store
                .conditional_update(&id, Precondition::Unconsumed, RecordPatch::MarkConsumed)
                .await
                .unwrap()
                .matched()
        }));
    }

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_query_expired_and_delete_many() {
    let store = setup_store().await;
    let expired = record(Duration::hours(-1), false);
    let live = record(Duration::hours(1), false);
    store.create(&expired).await.unwrap();
    store.create(&live).await.unwrap();

    let found = store.query_expired(Utc::now()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, expired.id);
    assert_eq!(found[0].storage_path, expired.storage_path);

    let ids = vec![expired.id.clone(), Uuid::new_v4().to_string()];
    assert_eq!(store.delete_many(&ids).await.unwrap(), 1);
    assert_eq!(store.delete_many(&ids).await.unwrap(), 0);
    assert_eq!(store.delete_many(&[]).await.unwrap(), 0);
    assert!(store.get(&live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_reports_whether_removed() {
    let store = setup_store().await;
    let r = record(Duration::hours(1), false);
    store.create(&r).await.unwrap();

    assert!(store.delete(&r.id).await.unwrap());
    assert!(!store.delete(&r.id).await.unwrap());
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    database::run_migrations(&db).await.unwrap();
}
