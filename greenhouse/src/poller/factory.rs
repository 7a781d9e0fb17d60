use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::info_span;

use super::tasks::{CameraPollTask, LightGate, ReadingPollTask, SoilWateringPollTask};
use super::{IDLE_SLICE, PollTask, PollWorker, PollerSupervisor};
use crate::clock::SharedClock;
use crate::pump::PumpManager;
use crate::record::{Reading, RecordSender, SensorRecord};
use crate::scheduler::{PollInterval, Scheduler};
use crate::sensors::{CameraManager, SharedSensor};

/// Builds supervised pollers that share a clock, an interval and a record
/// queue.
pub struct SensorPollerFactory {
    clock: SharedClock,
    interval: PollInterval,
    sender: RecordSender,
    idle_slice: Duration,
}

impl SensorPollerFactory {
    pub fn new(clock: SharedClock, interval: PollInterval, sender: RecordSender) -> Self {
        Self {
            clock,
            interval,
            sender,
            idle_slice: IDLE_SLICE,
        }
    }

    /// Override how often idle workers re-check for a stop request.
    pub fn with_idle_slice(mut self, idle_slice: Duration) -> Self {
        self.idle_slice = idle_slice;
        self
    }

    pub fn create_temperature_poller(&self, sensor: SharedSensor) -> PollerSupervisor {
        self.reading_poller("temperature", sensor, SensorRecord::Temperature)
    }

    pub fn create_humidity_poller(&self, sensor: SharedSensor) -> PollerSupervisor {
        self.reading_poller("humidity", sensor, SensorRecord::Humidity)
    }

    pub fn create_ambient_light_poller(&self, sensor: SharedSensor) -> PollerSupervisor {
        self.reading_poller("ambient_light", sensor, SensorRecord::AmbientLight)
    }

    pub fn create_soil_watering_poller(
        &self,
        sensor: SharedSensor,
        pump_manager: PumpManager,
    ) -> PollerSupervisor {
        self.supervise(SoilWateringPollTask::new(
            sensor,
            pump_manager,
            self.sender.clone(),
        ))
    }

    pub fn create_camera_poller(
        &self,
        camera: Arc<Mutex<CameraManager>>,
        light_gate: Option<LightGate>,
    ) -> PollerSupervisor {
        self.supervise(CameraPollTask::new(camera, light_gate))
    }

    fn reading_poller(
        &self,
        name: &'static str,
        sensor: SharedSensor,
        to_record: fn(Reading) -> SensorRecord,
    ) -> PollerSupervisor {
        self.supervise(ReadingPollTask::new(
            name,
            sensor,
            to_record,
            self.sender.clone(),
        ))
    }

    fn supervise<T: PollTask + 'static>(&self, task: T) -> PollerSupervisor {
        let name = task.name().to_string();
        let span = info_span!("poller", kind = %name);
        let scheduler = Scheduler::new(self.clock.clone(), self.interval);
        let worker = PollWorker::new(scheduler, task, span).with_idle_slice(self.idle_slice);
        PollerSupervisor::new(name, move |cancel| worker.run(cancel).boxed())
    }
}
