//! Combined temperature/humidity device (DHT11 style).
//!
//! Both values come from one physical read, and the device must not be polled
//! faster than about once every two seconds. The temperature and humidity
//! pollers fire on the same tick, so reads are cached briefly and shared.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::{SensorAccessor, SensorError};
use crate::clock::SharedClock;

/// How long a cached reading may be reused.
const FRESHNESS_THRESHOLD: TimeDelta = TimeDelta::seconds(2);

/// One combined reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// Raw combined temperature/humidity driver.
pub trait ClimateDevice: Send {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

struct CacheState {
    device: Box<dyn ClimateDevice>,
    last: Option<(DateTime<Utc>, ClimateReading)>,
}

/// Thread-safe caching wrapper around a [`ClimateDevice`].
pub struct CachingClimateSensor {
    clock: SharedClock,
    state: Mutex<CacheState>,
}

impl CachingClimateSensor {
    pub fn new(device: impl ClimateDevice + 'static, clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(CacheState {
                device: Box::new(device),
                last: None,
            }),
        }
    }

    /// A recent reading, taken from the device only if the cached one is stale.
    pub fn read(&self) -> Result<ClimateReading, SensorError> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        if let Some((taken_at, reading)) = state.last {
            if now - taken_at < FRESHNESS_THRESHOLD {
                return Ok(reading);
            }
        }
        let reading = state.device.read()?;
        state.last = Some((now, reading));
        Ok(reading)
    }

    pub fn temperature_sensor(self: &Arc<Self>) -> TemperatureSensor {
        TemperatureSensor(self.clone())
    }

    pub fn humidity_sensor(self: &Arc<Self>) -> HumiditySensor {
        HumiditySensor(self.clone())
    }
}

/// Temperature view of a shared climate sensor.
pub struct TemperatureSensor(Arc<CachingClimateSensor>);

impl SensorAccessor for TemperatureSensor {
    fn read(&self) -> Result<f64, SensorError> {
        self.0.read().map(|r| r.temperature)
    }
}

/// Humidity view of a shared climate sensor.
pub struct HumiditySensor(Arc<CachingClimateSensor>);

impl SensorAccessor for HumiditySensor {
    fn read(&self) -> Result<f64, SensorError> {
        self.0.read().map(|r| r.humidity)
    }
}
