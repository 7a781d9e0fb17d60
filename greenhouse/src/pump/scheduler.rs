use tracing::debug;

use super::SleepWindow;
use crate::clock::{LocalZone, SharedClock};

/// Keeps the pump off during quiet hours.
pub struct PumpScheduler {
    clock: SharedClock,
    zone: LocalZone,
    sleep_windows: Vec<SleepWindow>,
}

impl PumpScheduler {
    pub fn new(clock: SharedClock, zone: LocalZone, sleep_windows: Vec<SleepWindow>) -> Self {
        Self {
            clock,
            zone,
            sleep_windows,
        }
    }

    /// `false` while the local time of day is inside any sleep window.
    pub fn is_running_pump_allowed(&self) -> bool {
        let now = self.zone.time_of_day(self.clock.now());
        match self.sleep_windows.iter().find(|w| w.contains(now)) {
            Some(window) => {
                debug!(%window, time = %now, "Inside sleep window");
                false
            }
            None => true,
        }
    }
}
