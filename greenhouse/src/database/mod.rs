//! SQLite persistence for records.
//!
//! One table per record kind, created by the migrations under `migrations/`.
//! Timestamps are stored as `INTEGER` Unix epoch milliseconds (UTC).

mod repositories;

pub use repositories::{SqlxReadingStore, SqlxWateringEventStore};

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::record::RecordStores;
use crate::{Error, Result};

/// Database connection pool type alias.
pub type DbPool = Pool<Sqlite>;

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "greenhouse.db";

/// Only the record processor writes, so a few connections are plenty.
const DEFAULT_POOL_SIZE: u32 = 4;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Open (creating if needed) the SQLite database at `path`.
pub async fn init_pool(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_POOL_SIZE)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(connect_options)
        .await?;

    info!(
        path = %path.display(),
        max_connections = DEFAULT_POOL_SIZE,
        "Database pool initialized"
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Open `DATABASE_FILE` under `data_dir` and bring its schema up to date.
pub async fn open_database(data_dir: &Path) -> Result<DbPool> {
    let pool = init_pool(&data_dir.join(DATABASE_FILE)).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Stores for every record kind, all backed by `pool`.
pub fn record_stores(pool: &DbPool) -> RecordStores {
    RecordStores {
        temperature: Box::new(SqlxReadingStore::temperature(pool.clone())),
        humidity: Box::new(SqlxReadingStore::humidity(pool.clone())),
        ambient_light: Box::new(SqlxReadingStore::ambient_light(pool.clone())),
        soil_moisture: Box::new(SqlxReadingStore::soil_moisture(pool.clone())),
        watering_events: Box::new(SqlxWateringEventStore::new(pool.clone())),
    }
}

#[inline]
pub(crate) fn datetime_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn ms_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::storage(format!("timestamp out of range: {}ms", ms)))
}
