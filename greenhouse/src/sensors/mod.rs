//! Sensor and camera access.
//!
//! The poll workers only see [`SensorAccessor`] and [`CameraAccessor`]. The
//! device-facing pieces here (shared ADC, caching climate sensor, light and
//! soil scaling) sit between those traits and the raw drivers.

mod adc;
mod camera;
mod climate;
pub mod simulated;

pub use adc::{ADC_MAX_VALUE, LightSensor, RawAdc, SoilMoistureSensor, ThreadSafeAdc};
pub use camera::{CameraAccessor, CameraManager};
pub use climate::{
    CachingClimateSensor, ClimateDevice, ClimateReading, HumiditySensor, TemperatureSensor,
};

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by device reads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("{device} read failed: {message}")]
    ReadFailed { device: String, message: String },

    #[error("light sensor reading of {reading} is less than the minimum expected value of {minimum}")]
    LightTooLow { reading: u16, minimum: u16 },

    #[error("invalid ADC channel {0}")]
    InvalidChannel(u8),

    #[error("camera error: {0}")]
    Camera(String),
}

impl SensorError {
    pub fn read_failed(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            device: device.into(),
            message: message.into(),
        }
    }
}

/// A single synchronous numeric reading from one sensor.
pub trait SensorAccessor: Send + Sync {
    fn read(&self) -> Result<f64, SensorError>;
}

impl<F> SensorAccessor for F
where
    F: Fn() -> Result<f64, SensorError> + Send + Sync,
{
    fn read(&self) -> Result<f64, SensorError> {
        self()
    }
}

/// Shared sensor handle.
pub type SharedSensor = Arc<dyn SensorAccessor>;
