//! SQLx implementations of the record store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DbPool, datetime_to_ms, ms_to_datetime};
use crate::Result;
use crate::record::store::{ReadingStore, SoilMoistureStore, WateringEventStore};
use crate::record::{Reading, WateringEvent};

/// Readings of one kind, in their own `(timestamp, value)` table.
pub struct SqlxReadingStore {
    pool: DbPool,
    table: &'static str,
}

impl SqlxReadingStore {
    fn new(pool: DbPool, table: &'static str) -> Self {
        Self { pool, table }
    }

    pub fn temperature(pool: DbPool) -> Self {
        Self::new(pool, "temperature")
    }

    pub fn humidity(pool: DbPool) -> Self {
        Self::new(pool, "humidity")
    }

    pub fn ambient_light(pool: DbPool) -> Self {
        Self::new(pool, "ambient_light")
    }

    pub fn soil_moisture(pool: DbPool) -> Self {
        Self::new(pool, "soil_moisture")
    }
}

#[async_trait]
impl ReadingStore for SqlxReadingStore {
    async fn insert(&self, reading: &Reading) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (timestamp, value) VALUES (?, ?)",
            self.table
        ))
        .bind(datetime_to_ms(reading.timestamp))
        .bind(reading.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SoilMoistureStore for SqlxReadingStore {
    async fn latest(&self) -> Result<Option<f64>> {
        let value = sqlx::query_scalar::<_, f64>(&format!(
            "SELECT value FROM {} ORDER BY timestamp DESC LIMIT 1",
            self.table
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }
}

/// Watering events in the `watering_events` table.
pub struct SqlxWateringEventStore {
    pool: DbPool,
}

impl SqlxWateringEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WateringEventStore for SqlxWateringEventStore {
    async fn insert(&self, event: &WateringEvent) -> Result<()> {
        sqlx::query("INSERT INTO watering_events (timestamp, water_pumped_ml) VALUES (?, ?)")
            .bind(datetime_to_ms(event.timestamp))
            .bind(event.water_pumped_ml)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_watering(&self) -> Result<Option<DateTime<Utc>>> {
        let ms = sqlx::query_scalar::<_, i64>(
            "SELECT timestamp FROM watering_events ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        ms.map(ms_to_datetime).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{open_database, record_stores};
    use chrono::TimeZone;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 7, 23, 10, minute, 0).unwrap()
    }

    async fn count(pool: &DbPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_latest_is_newest_by_timestamp_not_insert_order() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_database(dir.path()).await.unwrap();
        let store = SqlxReadingStore::soil_moisture(pool.clone());

        assert_eq!(store.latest().await.unwrap(), None);

        store.insert(&Reading::new(ts(30), 400.0)).await.unwrap();
        store.insert(&Reading::new(ts(15), 500.0)).await.unwrap();

        assert_eq!(store.latest().await.unwrap(), Some(400.0));
        assert_eq!(count(&pool, "soil_moisture").await, 2);
    }

    #[tokio::test]
    async fn test_latest_watering() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_database(dir.path()).await.unwrap();
        let store = SqlxWateringEventStore::new(pool);

        assert_eq!(store.latest_watering().await.unwrap(), None);

        store
            .insert(&WateringEvent::new(ts(45), 200.0))
            .await
            .unwrap();
        store.insert(&WateringEvent::new(ts(0), 150.0)).await.unwrap();

        assert_eq!(store.latest_watering().await.unwrap(), Some(ts(45)));
    }

    #[tokio::test]
    async fn test_each_kind_writes_its_own_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_database(dir.path()).await.unwrap();
        let stores = record_stores(&pool);

        stores
            .temperature
            .insert(&Reading::new(ts(0), 21.5))
            .await
            .unwrap();
        stores
            .ambient_light
            .insert(&Reading::new(ts(0), 88.0))
            .await
            .unwrap();
        stores
            .ambient_light
            .insert(&Reading::new(ts(15), 90.0))
            .await
            .unwrap();

        assert_eq!(count(&pool, "temperature").await, 1);
        assert_eq!(count(&pool, "humidity").await, 0);
        assert_eq!(count(&pool, "ambient_light").await, 2);
        assert_eq!(count(&pool, "soil_moisture").await, 0);
        assert_eq!(count(&pool, "watering_events").await, 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let pool = open_database(dir.path()).await.unwrap();
            let stores = record_stores(&pool);
            stores
                .soil_moisture
                .insert(&Reading::new(ts(0), 610.0))
                .await
                .unwrap();
            stores
                .watering_events
                .insert(&WateringEvent::new(ts(0), 200.0))
                .await
                .unwrap();
            pool.close().await;
        }

        let pool = open_database(dir.path()).await.unwrap();
        let stores = record_stores(&pool);
        assert_eq!(stores.soil_moisture.latest().await.unwrap(), Some(610.0));
        assert_eq!(
            stores.watering_events.latest_watering().await.unwrap(),
            Some(ts(0))
        );
    }
}
