use crate::entities::share_records;
use crate::services::memory::InMemoryMetadataStore;
use crate::services::metadata_store::{MetadataStore, SeaOrmMetadataStore};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Metadata store for this process: SeaORM when `DATABASE_URL` is set,
/// process-local otherwise.
pub async fn setup_metadata_store() -> anyhow::Result<Arc<dyn MetadataStore>> {
    match env::var("DATABASE_URL") {
        Ok(db_url) => {
            let db = setup_database(&db_url).await?;
            Ok(Arc::new(SeaOrmMetadataStore::new(db)))
        }
        Err(_) => {
            warn!("⚠️ DATABASE_URL not set, share records are kept in memory only");
            Ok(Arc::new(InMemoryMetadataStore::new()))
        }
    }
}

pub async fn setup_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", redact(db_url));

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Creates `share_records` and its indexes if they do not exist yet
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🔄 Running SeaORM auto-migrations...");
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let table = schema
        .create_table_from_entity(share_records::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(share_records::Entity) {
        let index = index.if_not_exists().to_owned();
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

/// Hides the password part of a connection URL
fn redact(db_url: &str) -> String {
    match (db_url.find("://"), db_url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &db_url[scheme_end + 3..at];
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{}{}:***{}", &db_url[..scheme_end + 3], user, &db_url[at..])
        }
        _ => db_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("postgres://ghost:secret@db:5432/ghost"),
            "postgres://ghost:***@db:5432/ghost"
        );
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }
}
