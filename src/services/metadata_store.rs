use crate::entities::{prelude::*, *};
use crate::models::{ConditionalUpdate, ExpiredShare, Precondition, RecordPatch, ShareRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};

/// Durable home of share records. Every method is a single round trip and
/// deleting an absent row is not an error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(&self, record: &ShareRecord) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<ShareRecord>>;
    /// Returns whether a row was removed
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Returns the number of rows actually removed
    async fn delete_many(&self, ids: &[String]) -> Result<u64>;
    /// Records with `expires_at < now`
    async fn query_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredShare>>;
    /// Applies `patch` only if `precondition` still holds, atomically.
    async fn conditional_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: RecordPatch,
    ) -> Result<ConditionalUpdate>;
    async fn ping(&self) -> Result<()>;
}

pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn create(&self, record: &ShareRecord) -> Result<()> {
        let active: share_records::ActiveModel = record.into();
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ShareRecord>> {
        let model = ShareRecords::find_by_id(id).one(&self.db).await?;
        Ok(model.map(ShareRecord::from))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let res = ShareRecords::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = ShareRecords::delete_many()
            .filter(share_records::Column::Id.is_in(ids.iter().cloned()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn query_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredShare>> {
        let rows: Vec<(String, String)> = ShareRecords::find()
            .select_only()
            .column(share_records::Column::Id)
            .column(share_records::Column::StoragePath)
            .filter(share_records::Column::ExpiresAt.lt(now))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, storage_path)| ExpiredShare { id, storage_path })
            .collect())
    }

    async fn conditional_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: RecordPatch,
    ) -> Result<ConditionalUpdate> {
        let Some(mut record) = self.get(id).await? else {
            return Ok(ConditionalUpdate::NotMatched);
        };

        let mut update = ShareRecords::update_many().filter(share_records::Column::Id.eq(id));

        update = match precondition {
            Precondition::Unconsumed => update.filter(share_records::Column::Consumed.eq(false)),
        };
        update = match patch {
            RecordPatch::MarkConsumed => {
                update.col_expr(share_records::Column::Consumed, Expr::value(true))
            }
        };

        // UPDATE ... WHERE id = ? AND <precondition>: the row lock decides the race
        let res = update.exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Ok(ConditionalUpdate::NotMatched);
        }

        // Only the patched columns changed, so the winner's view is the
        // pre-read row with the patch applied
        patch.apply(&mut record);
        Ok(ConditionalUpdate::Matched(record))
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
