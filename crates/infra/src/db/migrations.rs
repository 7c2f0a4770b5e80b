use sqlx::migrate::Migrator;
use sqlx::Row;

use super::DbPool;
use super::ConnectionError;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub const SCHEMA_VERSION: i64 = 1;

pub async fn run_migrations(pool: &DbPool) -> Result<(), ConnectionError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Highest successfully applied migration, `None` before the first connect.
pub async fn applied_version(pool: &DbPool) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT MAX(version) AS version
        FROM _sqlx_migrations
        WHERE success = 1
        "#,
    )
    .fetch_one(pool)
    .await?;
    row.try_get("version")
}
