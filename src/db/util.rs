use std::path::Path;

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous},
    SqlitePool,
};

use super::error::DbResult;

pub async fn open_seaorm(path: &Path) -> DbResult<DatabaseConnection> {
    log::debug!("Opening database {}", path.display());

    // Create via sqlx so we can customise the options
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal) // with WAL, worst that could happen is a rollback of last tx
        .pragma("cache_size", "-64000"); // 64MB memory cache

    let pool = SqlitePool::connect_with(options).await?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}
