//! Per-sensor poll strategies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::PollTask;
use crate::Result;
use crate::pump::PumpManager;
use crate::record::{Reading, RecordSender, SensorRecord, WateringEvent};
use crate::sensors::{CameraManager, SensorError, SharedSensor};

/// Reads one value per tick and enqueues it as a record.
pub struct ReadingPollTask {
    name: &'static str,
    sensor: SharedSensor,
    to_record: fn(Reading) -> SensorRecord,
    sender: RecordSender,
}

impl ReadingPollTask {
    pub fn new(
        name: &'static str,
        sensor: SharedSensor,
        to_record: fn(Reading) -> SensorRecord,
        sender: RecordSender,
    ) -> Self {
        Self {
            name,
            sensor,
            to_record,
            sender,
        }
    }
}

#[async_trait]
impl PollTask for ReadingPollTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn poll_once(&mut self, tick: DateTime<Utc>) -> Result<()> {
        let value = self.sensor.read()?;
        debug!(value, "Read sensor");
        self.sender.push((self.to_record)(Reading::new(tick, value)))
    }
}

/// Records soil moisture and waters the plant when the pump manager says so.
pub struct SoilWateringPollTask {
    sensor: SharedSensor,
    pump_manager: PumpManager,
    sender: RecordSender,
}

impl SoilWateringPollTask {
    pub fn new(sensor: SharedSensor, pump_manager: PumpManager, sender: RecordSender) -> Self {
        Self {
            sensor,
            pump_manager,
            sender,
        }
    }
}

#[async_trait]
impl PollTask for SoilWateringPollTask {
    fn name(&self) -> &str {
        "soil_watering"
    }

    async fn poll_once(&mut self, tick: DateTime<Utc>) -> Result<()> {
        let moisture = self.sensor.read()?;
        debug!(moisture, "Read soil moisture");
        self.sender
            .push(SensorRecord::SoilMoisture(Reading::new(tick, moisture)))?;

        let pumped = self.pump_manager.pump_if_needed(moisture).await?;
        if pumped > 0.0 {
            self.sender
                .push(SensorRecord::WateringEvent(WateringEvent::new(tick, pumped)))?;
        }
        Ok(())
    }
}

/// Optional ambient light threshold below which no photo is taken.
pub struct LightGate {
    pub sensor: SharedSensor,
    pub min_light_pct: f64,
}

/// Takes a photo each tick, skipping when it's too dark.
pub struct CameraPollTask {
    camera: Arc<Mutex<CameraManager>>,
    light_gate: Option<LightGate>,
}

impl CameraPollTask {
    pub fn new(camera: Arc<Mutex<CameraManager>>, light_gate: Option<LightGate>) -> Self {
        Self { camera, light_gate }
    }

    fn too_dark(&self) -> Result<bool> {
        let Some(gate) = &self.light_gate else {
            return Ok(false);
        };
        match gate.sensor.read() {
            Ok(light) => Ok(light < gate.min_light_pct),
            Err(SensorError::LightTooLow { reading, .. }) => {
                debug!(reading, "Light sensor below its usable range");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PollTask for CameraPollTask {
    fn name(&self) -> &str {
        "camera"
    }

    async fn poll_once(&mut self, _tick: DateTime<Utc>) -> Result<()> {
        if self.too_dark()? {
            debug!("Too dark for a photo, skipping");
            return Ok(());
        }
        let path = self.camera.lock().save_photo()?;
        info!(path = %path.display(), "Captured photo");
        Ok(())
    }
}
