//! Timestamped records and the queue that carries them to storage.
//!
//! Pollers push [`SensorRecord`]s through a [`RecordSender`]; the single
//! [`RecordProcessor`] owns the receiving end and the stores.

mod processor;
pub mod store;

pub use processor::{RecordProcessor, RecordStores};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{Error, Result};

/// A numeric sensor reading taken at a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Water added to the soil at a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WateringEvent {
    pub timestamp: DateTime<Utc>,
    pub water_pumped_ml: f64,
}

impl WateringEvent {
    pub fn new(timestamp: DateTime<Utc>, water_pumped_ml: f64) -> Self {
        Self {
            timestamp,
            water_pumped_ml,
        }
    }
}

/// Anything carrying the instant it describes.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Reading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for WateringEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Kinds of record, one per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Temperature,
    Humidity,
    AmbientLight,
    SoilMoisture,
    WateringEvent,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Temperature => "temperature",
            RecordKind::Humidity => "humidity",
            RecordKind::AmbientLight => "ambient_light",
            RecordKind::SoilMoisture => "soil_moisture",
            RecordKind::WateringEvent => "watering_event",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record destined for storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorRecord {
    Temperature(Reading),
    Humidity(Reading),
    AmbientLight(Reading),
    SoilMoisture(Reading),
    WateringEvent(WateringEvent),
}

impl SensorRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            SensorRecord::Temperature(_) => RecordKind::Temperature,
            SensorRecord::Humidity(_) => RecordKind::Humidity,
            SensorRecord::AmbientLight(_) => RecordKind::AmbientLight,
            SensorRecord::SoilMoisture(_) => RecordKind::SoilMoisture,
            SensorRecord::WateringEvent(_) => RecordKind::WateringEvent,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SensorRecord::Temperature(r)
            | SensorRecord::Humidity(r)
            | SensorRecord::AmbientLight(r)
            | SensorRecord::SoilMoisture(r) => r.timestamp,
            SensorRecord::WateringEvent(e) => e.timestamp,
        }
    }
}

/// Create an unbounded record queue.
///
/// The sender side is cheap to clone and may be used from any task or
/// thread; the receiver belongs to exactly one consumer.
pub fn record_queue() -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RecordSender { tx }, RecordReceiver { rx })
}

/// Producer handle of the record queue.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::UnboundedSender<SensorRecord>,
}

impl RecordSender {
    /// Enqueue a record. Fails only once the receiver has been dropped.
    pub fn push(&self, record: SensorRecord) -> Result<()> {
        self.tx.send(record).map_err(|_| Error::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle of the record queue.
#[derive(Debug)]
pub struct RecordReceiver {
    rx: mpsc::UnboundedReceiver<SensorRecord>,
}

impl RecordReceiver {
    /// Non-blocking dequeue. `None` when the queue is empty.
    pub fn try_pop(&mut self) -> Option<SensorRecord> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next record. `None` once every sender is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<SensorRecord> {
        self.rx.recv().await
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
