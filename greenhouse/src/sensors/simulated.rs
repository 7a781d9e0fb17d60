//! Stand-in hardware so the controller runs on a machine without sensors.
//!
//! Values drift along a fixed sawtooth so logs and stored records look alive
//! while staying reproducible between runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use super::{ADC_MAX_VALUE, CameraAccessor, ClimateDevice, ClimateReading, RawAdc, SensorError};
use crate::pump::PumpSwitch;

/// Offset in `[-amplitude, amplitude]` that walks one step per call.
fn sawtooth(step: u64, amplitude: i64) -> i64 {
    if amplitude <= 0 {
        return 0;
    }
    let period = (4 * amplitude) as u64;
    let phase = (step % period) as i64;
    if phase <= 2 * amplitude {
        phase - amplitude
    } else {
        3 * amplitude - phase
    }
}

/// Converter whose channels hover around configured base values.
pub struct SimulatedAdc {
    channels: HashMap<u8, (u16, u64)>,
    amplitude: i64,
}

impl SimulatedAdc {
    pub fn new(amplitude: u16) -> Self {
        Self {
            channels: HashMap::new(),
            amplitude: i64::from(amplitude),
        }
    }

    pub fn with_channel(mut self, channel: u8, base: u16) -> Self {
        self.channels.insert(channel, (base, 0));
        self
    }
}

impl RawAdc for SimulatedAdc {
    fn read_channel(&mut self, channel: u8) -> Result<u16, SensorError> {
        let amplitude = self.amplitude;
        let (base, step) = self
            .channels
            .get_mut(&channel)
            .ok_or(SensorError::InvalidChannel(channel))?;
        let value = i64::from(*base) + sawtooth(*step, amplitude);
        *step += 1;
        Ok(value.clamp(0, i64::from(ADC_MAX_VALUE)) as u16)
    }
}

/// Temperature/humidity device drifting around a base reading.
pub struct SimulatedClimate {
    base: ClimateReading,
    step: u64,
}

impl SimulatedClimate {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            base: ClimateReading {
                temperature,
                humidity,
            },
            step: 0,
        }
    }
}

impl ClimateDevice for SimulatedClimate {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let offset = sawtooth(self.step, 5) as f64;
        self.step += 1;
        Ok(ClimateReading {
            temperature: self.base.temperature + offset * 0.5,
            humidity: (self.base.humidity + offset).clamp(0.0, 100.0),
        })
    }
}

/// Camera that writes empty placeholder files.
#[derive(Default, Clone)]
pub struct SimulatedCamera {
    captured: Arc<Mutex<Vec<PathBuf>>>,
}

impl SimulatedCamera {
    pub fn captured(&self) -> Vec<PathBuf> {
        self.captured.lock().clone()
    }
}

impl CameraAccessor for SimulatedCamera {
    fn capture(&mut self, destination: &Path) -> Result<(), SensorError> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SensorError::Camera(e.to_string()))?;
        }
        std::fs::write(destination, b"").map_err(|e| SensorError::Camera(e.to_string()))?;
        self.captured.lock().push(destination.to_path_buf());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

/// Pump switch that only logs.
#[derive(Debug, Default)]
pub struct LoggingPumpSwitch {
    on: AtomicBool,
}

impl LoggingPumpSwitch {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

impl PumpSwitch for LoggingPumpSwitch {
    fn set_on(&self, on: bool) -> crate::Result<()> {
        self.on.store(on, Ordering::SeqCst);
        info!(on, "Pump switched");
        Ok(())
    }
}
