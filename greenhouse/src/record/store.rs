//! Record store traits.
//!
//! The processor writes through [`ReadingStore`], [`SoilMoistureStore`] and
//! [`WateringEventStore`]. The SQLite implementations live in
//! [`crate::database`]; [`MemoryStore`] keeps everything in process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{Reading, RecordStores, Timestamped, WateringEvent};
use crate::Result;

/// Store for plain sensor readings.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn insert(&self, reading: &Reading) -> Result<()>;
}

/// Soil moisture store, which can also report the newest reading.
#[async_trait]
pub trait SoilMoistureStore: ReadingStore {
    /// Value of the reading with the greatest timestamp.
    async fn latest(&self) -> Result<Option<f64>>;
}

/// Store for watering events.
#[async_trait]
pub trait WateringEventStore: Send + Sync {
    async fn insert(&self, event: &WateringEvent) -> Result<()>;

    /// Time of the most recent watering, if any.
    async fn latest_watering(&self) -> Result<Option<DateTime<Utc>>>;
}

fn newest<T: Timestamped + Copy>(items: &[T]) -> Option<T> {
    items.iter().copied().max_by_key(|item| item.timestamp())
}

/// In-memory store. Clones share the same backing list.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything inserted so far.
    pub fn records(&self) -> Vec<T> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore<Reading> {
    async fn insert(&self, reading: &Reading) -> Result<()> {
        self.records.lock().push(*reading);
        Ok(())
    }
}

#[async_trait]
impl SoilMoistureStore for MemoryStore<Reading> {
    async fn latest(&self) -> Result<Option<f64>> {
        Ok(newest(&self.records.lock()).map(|r| r.value))
    }
}

#[async_trait]
impl WateringEventStore for MemoryStore<WateringEvent> {
    async fn insert(&self, event: &WateringEvent) -> Result<()> {
        self.records.lock().push(*event);
        Ok(())
    }

    async fn latest_watering(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(newest(&self.records.lock()).map(|e| e.timestamp))
    }
}

/// Handles onto a full set of in-memory stores, for inspecting what the
/// processor wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    pub temperature: MemoryStore<Reading>,
    pub humidity: MemoryStore<Reading>,
    pub ambient_light: MemoryStore<Reading>,
    pub soil_moisture: MemoryStore<Reading>,
    pub watering_events: MemoryStore<WateringEvent>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxed stores for a [`RecordProcessor`](super::RecordProcessor),
    /// sharing data with `self`.
    pub fn record_stores(&self) -> RecordStores {
        RecordStores {
            temperature: Box::new(self.temperature.clone()),
            humidity: Box::new(self.humidity.clone()),
            ambient_light: Box::new(self.ambient_light.clone()),
            soil_moisture: Box::new(self.soil_moisture.clone()),
            watering_events: Box::new(self.watering_events.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 7, 23, 10, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_latest_is_newest_by_timestamp() {
        let store = MemoryStore::<Reading>::new();
        assert_eq!(store.latest().await.unwrap(), None);

        store.insert(&Reading::new(ts(30), 400.0)).await.unwrap();
        store.insert(&Reading::new(ts(15), 500.0)).await.unwrap();

        assert_eq!(store.latest().await.unwrap(), Some(400.0));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_records() {
        let store = MemoryStore::<WateringEvent>::new();
        let writer = store.clone();
        writer
            .insert(&WateringEvent::new(ts(0), 200.0))
            .await
            .unwrap();
        assert_eq!(store.records(), vec![WateringEvent::new(ts(0), 200.0)]);
        assert_eq!(store.latest_watering().await.unwrap(), Some(ts(0)));
    }

    #[tokio::test]
    async fn test_memory_stores_share_with_record_stores() {
        let memory = MemoryStores::new();
        let stores = memory.record_stores();

        stores
            .humidity
            .insert(&Reading::new(ts(0), 41.0))
            .await
            .unwrap();

        assert_eq!(memory.humidity.records(), vec![Reading::new(ts(0), 41.0)]);
        assert!(memory.temperature.is_empty());
    }
}
