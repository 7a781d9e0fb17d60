//! Background sensor polling.
//!
//! Each sensor gets its own [`PollWorker`] running on a tokio task under a
//! [`PollerSupervisor`]. Workers are independent of one another and only
//! share the record queue.

mod factory;
mod supervisor;
mod tasks;
mod worker;

pub use factory::SensorPollerFactory;
pub use supervisor::{PollerSupervisor, WorkerState};
pub use tasks::{CameraPollTask, LightGate, ReadingPollTask, SoilWateringPollTask};
pub use worker::{IDLE_SLICE, PollTask, PollWorker};
