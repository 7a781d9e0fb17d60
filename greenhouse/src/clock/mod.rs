//! Wall-clock access and waiting.
//!
//! Every component that needs the current time or has to sleep goes through
//! [`Clock`], so tests can drive the controller with a [`ManualClock`]
//! instead of real time.

mod timer;
mod zone;

pub use timer::ForcedWateringTimer;
pub use zone::LocalZone;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::{Error, Result};

/// Source of the current time and of delays.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time (UTC).
    fn now(&self) -> DateTime<Utc>;

    /// Wait for the given amount of time.
    ///
    /// Fails with [`Error::InvalidArgument`] if `duration` is negative.
    async fn wait(&self, duration: TimeDelta) -> Result<()>;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

fn check_wait(duration: TimeDelta) -> Result<()> {
    if duration < TimeDelta::zero() {
        return Err(Error::invalid_argument(format!(
            "wait time cannot be negative: {}ms",
            duration.num_milliseconds()
        )));
    }
    Ok(())
}

/// Clock backed by the system time and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn wait(&self, duration: TimeDelta) -> Result<()> {
        check_wait(duration)?;
        let duration = duration
            .to_std()
            .map_err(|e| Error::invalid_argument(e.to_string()))?;
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

/// Clock whose time only moves when told to.
///
/// `wait` advances the clock by the requested amount and returns immediately
/// (after yielding to the runtime), and every wait is recorded so callers can
/// assert on how long a component asked to sleep.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    waits: Mutex<Vec<TimeDelta>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            waits: Mutex::new(Vec::new()),
        }
    }

    /// Create a shared manual clock.
    pub fn shared(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self::new(start))
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward without recording a wait.
    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock() += delta;
    }

    /// All waits requested so far, oldest first.
    pub fn waits(&self) -> Vec<TimeDelta> {
        self.waits.lock().clone()
    }

    /// The most recent wait, if any.
    pub fn last_wait(&self) -> Option<TimeDelta> {
        self.waits.lock().last().copied()
    }

    pub fn clear_waits(&self) {
        self.waits.lock().clear();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    async fn wait(&self, duration: TimeDelta) -> Result<()> {
        check_wait(duration)?;
        self.waits.lock().push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
        Ok(())
    }
}
