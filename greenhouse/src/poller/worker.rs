//! The poll loop shared by every sensor kind.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info};

use crate::Result;
use crate::scheduler::Scheduler;

/// Upper bound on how long a worker waits before re-checking for a stop
/// request.
pub const IDLE_SLICE: Duration = Duration::from_millis(500);

/// What a worker does at each tick.
#[async_trait]
pub trait PollTask: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Do one round of work. Records produced here carry `tick` as their
    /// timestamp.
    async fn poll_once(&mut self, tick: DateTime<Utc>) -> Result<()>;
}

/// Runs a [`PollTask`] on every tick of its own [`Scheduler`] until
/// cancelled.
pub struct PollWorker<T> {
    scheduler: Scheduler,
    task: T,
    span: Span,
    idle_slice: Duration,
}

impl<T: PollTask> PollWorker<T> {
    pub fn new(scheduler: Scheduler, task: T, span: Span) -> Self {
        Self {
            scheduler,
            task,
            span,
            idle_slice: IDLE_SLICE,
        }
    }

    pub fn with_idle_slice(mut self, idle_slice: Duration) -> Self {
        self.idle_slice = idle_slice;
        self
    }

    /// Poll until `cancel` fires or the task fails.
    ///
    /// A poll that has already started always completes; cancellation is
    /// only observed while waiting for the next tick.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let span = self.span.clone();
        async move {
            info!(
                task = self.task.name(),
                interval_secs = self.scheduler.interval().as_secs(),
                "Polling started"
            );
            let result = self.poll_loop(&cancel).await;
            info!(task = self.task.name(), "Polling stopped");
            result
        }
        .instrument(span)
        .await
    }

    async fn poll_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let ready = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                ready = self.scheduler.wait_until_next_tick(self.idle_slice) => ready?,
            };

            if cancel.is_cancelled() {
                return Ok(());
            }
            if !ready {
                continue;
            }
            let Some(tick) = self.scheduler.last_poll_time() else {
                continue;
            };

            debug!(%tick, "Polling");
            self.task.poll_once(tick).await?;
        }
    }
}
