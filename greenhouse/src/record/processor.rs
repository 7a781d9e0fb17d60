//! Single consumer that moves queued records into their stores.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::store::{ReadingStore, SoilMoistureStore, WateringEventStore};
use super::{RecordReceiver, SensorRecord};
use crate::Result;

/// One store per record kind.
pub struct RecordStores {
    pub temperature: Box<dyn ReadingStore>,
    pub humidity: Box<dyn ReadingStore>,
    pub ambient_light: Box<dyn ReadingStore>,
    pub soil_moisture: Box<dyn SoilMoistureStore>,
    pub watering_events: Box<dyn WateringEventStore>,
}

/// Drains the record queue into [`RecordStores`].
///
/// Only one processor exists per queue, so stores never see concurrent
/// writes.
pub struct RecordProcessor {
    receiver: RecordReceiver,
    stores: RecordStores,
}

impl RecordProcessor {
    pub fn new(receiver: RecordReceiver, stores: RecordStores) -> Self {
        Self { receiver, stores }
    }

    /// Store the next queued record, if there is one.
    ///
    /// Returns `false` without blocking when the queue is empty. A store
    /// failure is returned to the caller and the record is not retried.
    pub async fn try_process_next(&mut self) -> Result<bool> {
        let Some(record) = self.receiver.try_pop() else {
            return Ok(false);
        };
        trace!(kind = %record.kind(), timestamp = %record.timestamp(), "Storing record");
        self.store(&record).await?;
        Ok(true)
    }

    /// Process everything currently queued, returning how many records were
    /// stored.
    pub async fn drain(&mut self) -> Result<usize> {
        let mut stored = 0;
        while self.try_process_next().await? {
            stored += 1;
        }
        if stored > 0 {
            debug!(stored, "Drained record queue");
        }
        Ok(stored)
    }

    /// Store records as they arrive until `interrupt` resolves or `shutdown`
    /// is cancelled, checking the queue every `idle`.
    ///
    /// Store failures are logged and the record is dropped. If `interrupt`
    /// fails it is ignored from then on, leaving `shutdown` as the only way
    /// out.
    pub async fn run_until<F>(
        &mut self,
        interrupt: F,
        shutdown: &CancellationToken,
        idle: Duration,
    ) where
        F: Future<Output = std::io::Result<()>>,
    {
        tokio::pin!(interrupt);
        let mut interrupt_armed = true;
        loop {
            if let Err(e) = self.drain().await {
                error!(error = %e, "Failed to store record");
            }

            tokio::select! {
                result = &mut interrupt, if interrupt_armed => match result {
                    Ok(()) => {
                        info!("Shutdown requested");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to listen for shutdown signal");
                        interrupt_armed = false;
                    }
                },
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(idle) => {}
            }
        }
    }

    pub fn stores(&self) -> &RecordStores {
        &self.stores
    }

    async fn store(&self, record: &SensorRecord) -> Result<()> {
        match record {
            SensorRecord::Temperature(reading) => self.stores.temperature.insert(reading).await,
            SensorRecord::Humidity(reading) => self.stores.humidity.insert(reading).await,
            SensorRecord::AmbientLight(reading) => {
                self.stores.ambient_light.insert(reading).await
            }
            SensorRecord::SoilMoisture(reading) => {
                self.stores.soil_moisture.insert(reading).await
            }
            SensorRecord::WateringEvent(event) => {
                self.stores.watering_events.insert(event).await
            }
        }
    }
}
