//! Countdown that guarantees a maximum interval between waterings.

use chrono::{DateTime, TimeDelta, Utc};

use super::SharedClock;

/// Resettable countdown measured against a [`Clock`](super::Clock).
///
/// The timer expires `duration` after it was created or last reset. It is
/// only reset when a watering actually happens.
pub struct ForcedWateringTimer {
    clock: SharedClock,
    duration: TimeDelta,
    deadline: DateTime<Utc>,
}

impl ForcedWateringTimer {
    pub fn new(clock: SharedClock, duration: TimeDelta) -> Self {
        let deadline = clock.now() + duration;
        Self {
            clock,
            duration,
            deadline,
        }
    }

    /// Restore the countdown from the time of the most recent watering.
    ///
    /// With no history the timer keeps its full duration.
    pub fn resume_from(&mut self, last_watering: Option<DateTime<Utc>>) {
        if let Some(last) = last_watering {
            self.deadline = last + self.duration;
        }
    }

    pub fn expired(&self) -> bool {
        self.clock.now() >= self.deadline
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> TimeDelta {
        (self.deadline - self.clock.now()).max(TimeDelta::zero())
    }

    /// Restart the countdown at full duration from now.
    pub fn reset(&mut self) {
        self.deadline = self.clock.now() + self.duration;
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }
}

impl std::fmt::Debug for ForcedWateringTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForcedWateringTimer")
            .field("duration", &self.duration)
            .field("deadline", &self.deadline)
            .finish()
    }
}
