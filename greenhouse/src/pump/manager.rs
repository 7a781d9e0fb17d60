use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{PumpActuator, PumpScheduler};
use crate::Result;
use crate::clock::ForcedWateringTimer;

/// Decides when to water.
///
/// The pump runs when the soil is drier than the threshold or when the
/// forced-watering timer has run out, but never inside a sleep window.
pub struct PumpManager {
    pump: Box<dyn PumpActuator>,
    scheduler: Arc<PumpScheduler>,
    moisture_threshold: f64,
    pump_amount_ml: f64,
    timer: ForcedWateringTimer,
}

impl PumpManager {
    pub fn new(
        pump: impl PumpActuator + 'static,
        scheduler: Arc<PumpScheduler>,
        moisture_threshold: f64,
        pump_amount_ml: f64,
        timer: ForcedWateringTimer,
    ) -> Self {
        Self {
            pump: Box::new(pump),
            scheduler,
            moisture_threshold,
            pump_amount_ml,
            timer,
        }
    }

    /// Restart the forced-watering countdown from the last recorded watering.
    pub fn resume_from_history(&mut self, last_watering: Option<DateTime<Utc>>) {
        self.timer.resume_from(last_watering);
        debug!(
            last_watering = ?last_watering,
            remaining_secs = self.timer.remaining().num_seconds(),
            "Resumed forced watering timer"
        );
    }

    pub fn timer(&self) -> &ForcedWateringTimer {
        &self.timer
    }

    /// Water if needed and allowed, returning the millilitres pumped.
    pub async fn pump_if_needed(&mut self, moisture: f64) -> Result<f64> {
        if !self.scheduler.is_running_pump_allowed() {
            return Ok(0.0);
        }

        let too_dry = moisture < self.moisture_threshold;
        let forced = self.timer.expired();
        if !too_dry && !forced {
            return Ok(0.0);
        }

        info!(
            moisture,
            threshold = self.moisture_threshold,
            forced,
            amount_ml = self.pump_amount_ml,
            "Watering"
        );
        self.pump.pump_water(self.pump_amount_ml).await?;
        self.timer.reset();
        Ok(self.pump_amount_ml)
    }
}
