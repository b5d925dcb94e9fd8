use crate::models::ShareRecord;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "share_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[sea_orm(unique)]
    pub storage_path: String,
    pub created_at: DateTimeUtc,
    #[sea_orm(indexed)]
    pub expires_at: DateTimeUtc,
    pub one_time_consume: bool,
    pub consumed: bool,
    pub delete_after_send: bool,
    pub owner_email: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ShareRecord {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            mime_type: m.mime_type,
            size_bytes: m.size_bytes,
            storage_path: m.storage_path,
            created_at: m.created_at,
            expires_at: m.expires_at,
            one_time_consume: m.one_time_consume,
            consumed: m.consumed,
            delete_after_send: m.delete_after_send,
            owner_email: m.owner_email,
            password_hash: m.password_hash,
        }
    }
}

impl From<&ShareRecord> for ActiveModel {
    fn from(r: &ShareRecord) -> Self {
        use sea_orm::ActiveValue::Set;
        Self {
            id: Set(r.id.clone()),
            filename: Set(r.filename.clone()),
            mime_type: Set(r.mime_type.clone()),
            size_bytes: Set(r.size_bytes),
            storage_path: Set(r.storage_path.clone()),
            created_at: Set(r.created_at),
            expires_at: Set(r.expires_at),
            one_time_consume: Set(r.one_time_consume),
            consumed: Set(r.consumed),
            delete_after_send: Set(r.delete_after_send),
            owner_email: Set(r.owner_email.clone()),
            password_hash: Set(r.password_hash.clone()),
        }
    }
}
