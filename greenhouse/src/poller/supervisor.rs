//! Background execution and stop control for one poll worker.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{Error, Result};

/// Lifecycle of a supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, not started.
    Pending,
    /// Polling in the background.
    Running,
    /// Stop requested, the worker hasn't exited yet.
    StopRequested,
    /// Exited cleanly.
    Stopped,
    /// Exited with an error.
    Failed,
}

type WorkerFuture = BoxFuture<'static, Result<()>>;

/// Owns one poll worker and the task that runs it.
pub struct PollerSupervisor {
    name: String,
    worker: Mutex<Option<Box<dyn FnOnce(CancellationToken) -> WorkerFuture + Send>>>,
    cancellation_token: CancellationToken,
    state: Arc<Mutex<WorkerState>>,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl PollerSupervisor {
    /// Wrap a worker. `run` is called once, with this supervisor's
    /// cancellation token, when the poller is started.
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> WorkerFuture + Send + 'static,
    {
        Self {
            name: name.into(),
            worker: Mutex::new(Some(Box::new(run))),
            cancellation_token: CancellationToken::new(),
            state: Arc::new(Mutex::new(WorkerState::Pending)),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// Fails with [`Error::AlreadyStarted`] if called more than once or after
    /// the poller was stopped.
    pub fn start_async(&self) -> Result<()> {
        let run = self
            .worker
            .lock()
            .take()
            .ok_or_else(|| Error::AlreadyStarted(self.name.clone()))?;

        *self.state.lock() = WorkerState::Running;
        let future = run(self.cancellation_token.clone());
        let state = self.state.clone();
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            let result = future.await;
            let mut state = state.lock();
            match &result {
                Ok(()) => {
                    *state = WorkerState::Stopped;
                    debug!(poller = %name, "Poller exited");
                }
                Err(e) => {
                    *state = WorkerState::Failed;
                    error!(poller = %name, error = %e, "Poller failed");
                }
            }
            result
        });
        *self.handle.lock() = Some(handle);

        info!(poller = %self.name, "Poller started");
        Ok(())
    }

    /// Ask the worker to stop and return immediately.
    ///
    /// Safe to call repeatedly and from any thread. A poll already in
    /// progress is allowed to finish.
    pub fn stop(&self) {
        self.cancellation_token.cancel();

        // Never started: drop the worker so it can't be started later.
        if self.worker.lock().take().is_some() {
            *self.state.lock() = WorkerState::Stopped;
            return;
        }

        let mut state = self.state.lock();
        if *state == WorkerState::Running {
            *state = WorkerState::StopRequested;
            debug!(poller = %self.name, "Stop requested");
        }
    }

    /// Wait for the background task to exit and return the worker's result.
    ///
    /// Returns `Ok(())` immediately if the poller was never started or has
    /// already been joined.
    pub async fn join(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };
        match handle.await {
            Ok(result) => result,
            Err(e) => {
                *self.state.lock() = WorkerState::Failed;
                Err(Error::Other(format!("poller '{}' panicked: {}", self.name, e)))
            }
        }
    }
}

impl Drop for PollerSupervisor {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ForcedWateringTimer, LocalZone, ManualClock, SharedClock};
    use crate::poller::{PollWorker, SoilWateringPollTask};
    use crate::pump::{PumpActuator, PumpManager, PumpScheduler};
    use crate::record::{Reading, SensorRecord, WateringEvent, record_queue};
    use crate::scheduler::{PollInterval, Scheduler};
    use crate::sensors::{SensorError, SharedSensor};
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone, Utc};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tracing::Span;

    fn looping_supervisor(polls: Arc<AtomicUsize>) -> PollerSupervisor {
        PollerSupervisor::new("looping", move |cancel: CancellationToken| {
            async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(Duration::from_millis(5)) => {
                            polls.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_start_stop_join() {
        let polls = Arc::new(AtomicUsize::new(0));
        let supervisor = looping_supervisor(polls.clone());
        assert_eq!(supervisor.state(), WorkerState::Pending);

        supervisor.start_async().unwrap();
        assert_eq!(supervisor.state(), WorkerState::Running);
        tokio::time::sleep(Duration::from_millis(30)).await;

        supervisor.stop();
        supervisor.stop();
        supervisor.join().await.unwrap();

        assert_eq!(supervisor.state(), WorkerState::Stopped);
        let after_stop = polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(polls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_second_start_fails() {
        let supervisor = looping_supervisor(Arc::new(AtomicUsize::new(0)));
        supervisor.start_async().unwrap();

        assert!(matches!(
            supervisor.start_async(),
            Err(Error::AlreadyStarted(name)) if name == "looping"
        ));

        supervisor.stop();
        supervisor.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let supervisor = looping_supervisor(Arc::new(AtomicUsize::new(0)));
        supervisor.stop();

        assert_eq!(supervisor.state(), WorkerState::Stopped);
        assert!(supervisor.start_async().is_err());
        supervisor.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_worker() {
        let supervisor = PollerSupervisor::new("broken", |_cancel| {
            async { Err(Error::Other("sensor unplugged".to_string())) }.boxed()
        });
        supervisor.start_async().unwrap();

        assert!(supervisor.join().await.is_err());
        assert_eq!(supervisor.state(), WorkerState::Failed);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let supervisor = Arc::new(looping_supervisor(Arc::new(AtomicUsize::new(0))));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async { supervisor.start_async().unwrap() });
        let remote = supervisor.clone();
        std::thread::spawn(move || remote.stop()).join().unwrap();
        runtime.block_on(supervisor.join()).unwrap();

        assert_eq!(supervisor.state(), WorkerState::Stopped);
    }

    struct GatedPump {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PumpActuator for GatedPump {
        async fn pump_water(&self, _volume_ml: f64) -> Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stop_during_watering_lets_the_poll_finish() {
        let tick = Utc.with_ymd_and_hms(2016, 7, 23, 10, 45, 0).unwrap();
        let clock: SharedClock = ManualClock::shared(tick);
        let (tx, mut rx) = record_queue();

        let reads = Arc::new(AtomicUsize::new(0));
        let sensor_reads = reads.clone();
        let sensor: SharedSensor = Arc::new(move || {
            sensor_reads.fetch_add(1, Ordering::SeqCst);
            Ok::<f64, SensorError>(850.0)
        });

        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let pump = GatedPump {
            entered: entered.clone(),
            release: release.clone(),
        };
        let pump_scheduler = Arc::new(PumpScheduler::new(clock.clone(), LocalZone::System, vec![]));
        let manager = PumpManager::new(
            pump,
            pump_scheduler,
            900.0,
            200.0,
            ForcedWateringTimer::new(clock.clone(), TimeDelta::hours(24)),
        );

        let scheduler = Scheduler::new(clock, PollInterval::from_minutes(15).unwrap());
        let task = SoilWateringPollTask::new(sensor, manager, tx);
        let worker = PollWorker::new(scheduler, task, Span::none());
        let supervisor =
            PollerSupervisor::new("soil_watering", move |cancel| worker.run(cancel).boxed());

        supervisor.start_async().unwrap();
        entered.notified().await;
        supervisor.stop();
        assert_eq!(supervisor.state(), WorkerState::StopRequested);

        release.notify_one();
        supervisor.join().await.unwrap();
        assert_eq!(supervisor.state(), WorkerState::Stopped);

        assert_eq!(
            rx.try_pop(),
            Some(SensorRecord::SoilMoisture(Reading::new(tick, 850.0)))
        );
        assert_eq!(
            rx.try_pop(),
            Some(SensorRecord::WateringEvent(WateringEvent::new(tick, 200.0)))
        );
        assert!(rx.try_pop().is_none());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}
