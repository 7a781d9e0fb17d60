//! Pump control.
//!
//! [`PumpManager`] decides whether to water, [`PumpScheduler`] keeps the pump
//! off during configured quiet hours, and [`Pump`] turns a volume into an
//! on/off pulse of a [`PumpSwitch`].

mod actuator;
mod manager;
mod scheduler;
mod sleep_window;

pub use actuator::{PUMP_RATE_ML_PER_SEC, Pump};
pub use manager::PumpManager;
pub use scheduler::PumpScheduler;
pub use sleep_window::SleepWindow;

use async_trait::async_trait;

use crate::Result;

/// On/off control of the pump motor (a GPIO pin on real hardware).
pub trait PumpSwitch: Send + Sync {
    fn set_on(&self, on: bool) -> Result<()>;
}

/// Anything that can deliver a volume of water.
#[async_trait]
pub trait PumpActuator: Send + Sync {
    /// Pump `volume_ml` millilitres.
    ///
    /// Fails with [`Error::InvalidArgument`](crate::Error::InvalidArgument)
    /// for a negative volume. Zero is a no-op.
    async fn pump_water(&self, volume_ml: f64) -> Result<()>;
}
