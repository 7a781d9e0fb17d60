use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use tracing::info;

use super::{PumpActuator, PumpSwitch};
use crate::clock::SharedClock;
use crate::{Error, Result};

/// Calibrated flow rate of the pump (4300 ml per minute).
pub const PUMP_RATE_ML_PER_SEC: f64 = 4300.0 / 60.0;

/// Pump driven by a switch held on for as long as the volume requires.
pub struct Pump {
    switch: Arc<dyn PumpSwitch>,
    clock: SharedClock,
}

impl Pump {
    pub fn new(switch: Arc<dyn PumpSwitch>, clock: SharedClock) -> Self {
        Self { switch, clock }
    }

    /// Run time needed for `volume_ml`, rounded to whole milliseconds.
    pub fn run_time(volume_ml: f64) -> TimeDelta {
        TimeDelta::milliseconds((volume_ml / PUMP_RATE_ML_PER_SEC * 1000.0).round() as i64)
    }
}

#[async_trait]
impl PumpActuator for Pump {
    async fn pump_water(&self, volume_ml: f64) -> Result<()> {
        if volume_ml.is_nan() || volume_ml < 0.0 {
            return Err(Error::invalid_argument(format!(
                "water volume must be non-negative: {}",
                volume_ml
            )));
        }
        if volume_ml == 0.0 {
            return Ok(());
        }

        let run_time = Self::run_time(volume_ml);
        info!(
            volume_ml,
            run_time_ms = run_time.num_milliseconds(),
            "Running pump"
        );

        self.switch.set_on(true)?;
        let waited = self.clock.wait(run_time).await;
        let switched_off = self.switch.set_on(false);
        waited?;
        switched_off
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSwitch {
        states: Mutex<Vec<bool>>,
    }

    impl PumpSwitch for RecordingSwitch {
        fn set_on(&self, on: bool) -> Result<()> {
            self.states.lock().push(on);
            Ok(())
        }
    }

    fn pump() -> (Pump, Arc<RecordingSwitch>, Arc<ManualClock>) {
        let switch = Arc::new(RecordingSwitch::default());
        let clock = ManualClock::shared(Utc::now());
        (Pump::new(switch.clone(), clock.clone()), switch, clock)
    }

    #[tokio::test]
    async fn test_pump_runs_for_volume_over_rate() {
        let (pump, switch, clock) = pump();

        pump.pump_water(4300.0).await.unwrap();

        assert_eq!(*switch.states.lock(), vec![true, false]);
        assert_eq!(clock.waits(), vec![TimeDelta::seconds(60)]);
    }

    #[tokio::test]
    async fn test_zero_volume_is_noop() {
        let (pump, switch, clock) = pump();

        pump.pump_water(0.0).await.unwrap();

        assert!(switch.states.lock().is_empty());
        assert!(clock.waits().is_empty());
    }

    #[tokio::test]
    async fn test_negative_volume_is_rejected() {
        let (pump, switch, _clock) = pump();

        let result = pump.pump_water(-1.0).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(switch.states.lock().is_empty());
    }

    #[test]
    fn test_run_time_for_default_amount() {
        // 200 ml at 4300 ml/min
        assert_eq!(Pump::run_time(200.0), TimeDelta::milliseconds(2791));
    }
}
