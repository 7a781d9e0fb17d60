//! Controller configuration.
//!
//! Loaded from an optional TOML file; every field has a default, and command
//! line flags override file values.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::LocalZone;
use crate::pump::SleepWindow;
use crate::scheduler::PollInterval;
use crate::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenhouseConfig {
    /// Seconds between polls. All sensors share the same aligned ticks.
    pub poll_interval_secs: u64,
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Directory photos are written to.
    pub image_path: PathBuf,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Log filter directive, used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    /// IANA timezone for sleep windows and photo names; empty means the
    /// host's zone.
    pub timezone: String,
    pub pump: PumpConfig,
    pub camera: CameraConfig,
}

impl Default for GreenhouseConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            data_dir: PathBuf::from("data"),
            image_path: PathBuf::from("images"),
            log_dir: PathBuf::from("logs"),
            log_filter: None,
            timezone: String::new(),
            pump: PumpConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    15 * 60
}

/// Watering policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Water when soil moisture drops below this.
    #[serde(default = "default_moisture_threshold")]
    pub moisture_threshold: f64,
    /// Millilitres pumped per watering.
    #[serde(default = "default_pump_amount_ml")]
    pub pump_amount_ml: f64,
    /// Water at least this often, regardless of moisture.
    #[serde(default = "default_max_watering_interval_hours")]
    pub max_watering_interval_hours: u32,
    /// Quiet hours, e.g. `"22:00-07:00"`.
    #[serde(default)]
    pub sleep_windows: Vec<SleepWindow>,
}

fn default_moisture_threshold() -> f64 {
    300.0
}

fn default_pump_amount_ml() -> f64 {
    200.0
}

fn default_max_watering_interval_hours() -> u32 {
    24
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            moisture_threshold: default_moisture_threshold(),
            pump_amount_ml: default_pump_amount_ml(),
            max_watering_interval_hours: default_max_watering_interval_hours(),
            sleep_windows: Vec::new(),
        }
    }
}

impl PumpConfig {
    pub fn forced_interval(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.max_watering_interval_hours))
    }
}

/// Photo capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Skip photos while ambient light (percent) is below this.
    #[serde(default)]
    pub min_light_pct: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_light_pct: None,
        }
    }
}

/// Values given on the command line. `None` or empty leaves the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub poll_interval_secs: Option<u64>,
    pub sleep_windows: Vec<SleepWindow>,
    pub data_dir: Option<PathBuf>,
    pub image_path: Option<PathBuf>,
    pub moisture_threshold: Option<f64>,
}

impl GreenhouseConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(secs) = overrides.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        if !overrides.sleep_windows.is_empty() {
            self.pump.sleep_windows = overrides.sleep_windows;
        }
        if let Some(dir) = overrides.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = overrides.image_path {
            self.image_path = dir;
        }
        if let Some(threshold) = overrides.moisture_threshold {
            self.pump.moisture_threshold = threshold;
        }
    }

    /// Check everything that can't be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        self.poll_interval()?;
        self.zone()?;

        if self.pump.moisture_threshold.is_nan() || self.pump.moisture_threshold < 0.0 {
            return Err(Error::config(format!(
                "moisture_threshold must be non-negative: {}",
                self.pump.moisture_threshold
            )));
        }
        if self.pump.pump_amount_ml.is_nan() || self.pump.pump_amount_ml < 0.0 {
            return Err(Error::config(format!(
                "pump_amount_ml must be non-negative: {}",
                self.pump.pump_amount_ml
            )));
        }
        if self.pump.max_watering_interval_hours == 0 {
            return Err(Error::config(
                "max_watering_interval_hours must be greater than zero",
            ));
        }
        if let Some(min) = self.camera.min_light_pct {
            if !(0.0..=100.0).contains(&min) {
                return Err(Error::config(format!(
                    "camera.min_light_pct must be between 0 and 100: {}",
                    min
                )));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Result<PollInterval> {
        PollInterval::from_secs(self.poll_interval_secs)
    }

    pub fn zone(&self) -> Result<LocalZone> {
        self.timezone.parse()
    }
}
