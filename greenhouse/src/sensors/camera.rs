//! Photo capture into a local folder.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::SensorError;
use crate::clock::{LocalZone, SharedClock};

/// Camera driver.
pub trait CameraAccessor: Send {
    fn capture(&mut self, destination: &Path) -> Result<(), SensorError>;

    /// Release the device. Called once on shutdown.
    fn close(&mut self) -> Result<(), SensorError>;
}

/// Names and stores photos taken by a [`CameraAccessor`].
pub struct CameraManager {
    image_dir: PathBuf,
    clock: SharedClock,
    zone: LocalZone,
    camera: Box<dyn CameraAccessor>,
    closed: bool,
}

impl CameraManager {
    pub fn new(
        image_dir: impl Into<PathBuf>,
        clock: SharedClock,
        zone: LocalZone,
        camera: impl CameraAccessor + 'static,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            clock,
            zone,
            camera: Box::new(camera),
            closed: false,
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// File name for a photo taken now, e.g. `2016-07-23T10-51-09-0400.jpg`.
    fn photo_filename(&self) -> String {
        format!(
            "{}.jpg",
            self.zone.format(self.clock.now(), "%Y-%m-%dT%H-%M-%S%z")
        )
    }

    /// Capture one photo and return where it was written.
    pub fn save_photo(&mut self) -> Result<PathBuf, SensorError> {
        if self.closed {
            return Err(SensorError::Camera("camera is closed".to_string()));
        }
        let path = self.image_dir.join(self.photo_filename());
        self.camera.capture(&path)?;
        debug!(path = %path.display(), "Saved photo");
        Ok(path)
    }

    /// Close the camera. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), SensorError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!("Closing camera");
        self.camera.close()
    }
}
