//! Analog-to-digital converter access shared by several sensors.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{SensorAccessor, SensorError};

/// Highest value a 10-bit converter reports.
pub const ADC_MAX_VALUE: u16 = 1023;

/// Light sensor readings below this are treated as a wiring fault.
const LIGHT_SENSOR_MIN_VALUE: u16 = 290;

/// Raw converter driver.
pub trait RawAdc: Send {
    fn read_channel(&mut self, channel: u8) -> Result<u16, SensorError>;
}

/// Serializes channel reads so several pollers can share one converter.
pub struct ThreadSafeAdc {
    inner: Mutex<Box<dyn RawAdc>>,
}

impl ThreadSafeAdc {
    pub fn new(adc: impl RawAdc + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(adc)),
        }
    }

    pub fn shared(adc: impl RawAdc + 'static) -> Arc<Self> {
        Arc::new(Self::new(adc))
    }

    pub fn read_channel(&self, channel: u8) -> Result<u16, SensorError> {
        self.inner.lock().read_channel(channel)
    }
}

/// Ambient light as a percentage of the usable converter range.
pub struct LightSensor {
    adc: Arc<ThreadSafeAdc>,
    channel: u8,
}

impl LightSensor {
    pub fn new(adc: Arc<ThreadSafeAdc>, channel: u8) -> Self {
        Self { adc, channel }
    }

    pub fn ambient_light(&self) -> Result<f64, SensorError> {
        let raw = self.adc.read_channel(self.channel)?;
        if raw < LIGHT_SENSOR_MIN_VALUE {
            return Err(SensorError::LightTooLow {
                reading: raw,
                minimum: LIGHT_SENSOR_MIN_VALUE,
            });
        }
        let span = f64::from(ADC_MAX_VALUE - LIGHT_SENSOR_MIN_VALUE);
        Ok(100.0 * f64::from(raw - LIGHT_SENSOR_MIN_VALUE) / span)
    }
}

impl SensorAccessor for LightSensor {
    fn read(&self) -> Result<f64, SensorError> {
        self.ambient_light()
    }
}

/// Raw soil moisture level from one converter channel.
pub struct SoilMoistureSensor {
    adc: Arc<ThreadSafeAdc>,
    channel: u8,
}

impl SoilMoistureSensor {
    pub fn new(adc: Arc<ThreadSafeAdc>, channel: u8) -> Self {
        Self { adc, channel }
    }
}

impl SensorAccessor for SoilMoistureSensor {
    fn read(&self) -> Result<f64, SensorError> {
        let moisture = self.adc.read_channel(self.channel)?;
        tracing::debug!(channel = self.channel, moisture, "Soil moisture reading");
        Ok(f64::from(moisture))
    }
}
