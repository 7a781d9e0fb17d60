//! Tick alignment for periodic polling.
//!
//! A [`Scheduler`] hands out UNIX instants that fall on whole multiples of
//! its poll interval, so every poller configured with the same interval fires
//! at the same wall-clock boundaries (e.g. :00, :15, :30, :45 for 15 minutes).

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::clock::SharedClock;
use crate::{Error, Result};

/// Positive poll interval in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollInterval(u64);

impl PollInterval {
    pub fn from_secs(secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(Error::config("poll interval must be greater than zero"));
        }
        if secs > i64::MAX as u64 {
            return Err(Error::config(format!("poll interval too large: {}s", secs)));
        }
        Ok(Self(secs))
    }

    pub fn from_minutes(minutes: u64) -> Result<Self> {
        Self::from_secs(minutes.saturating_mul(60))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl TryFrom<Duration> for PollInterval {
    type Error = Error;

    fn try_from(value: Duration) -> Result<Self> {
        if value.subsec_nanos() != 0 {
            return Err(Error::config(format!(
                "poll interval must be a whole number of seconds: {:?}",
                value
            )));
        }
        Self::from_secs(value.as_secs())
    }
}

/// Smallest multiple of `multiple` that is >= `value`.
fn round_up_to_multiple(value: i64, multiple: i64) -> i64 {
    let rem = value.rem_euclid(multiple);
    if rem == 0 { value } else { value - rem + multiple }
}

/// Whole UNIX seconds, rounding any fractional part up.
fn ceil_unix_seconds(t: DateTime<Utc>) -> i64 {
    let secs = t.timestamp();
    if t.timestamp_subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Computes aligned poll instants and waits for them.
pub struct Scheduler {
    clock: SharedClock,
    interval: PollInterval,
    last_poll_time: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(clock: SharedClock, interval: PollInterval) -> Self {
        Self {
            clock,
            interval,
            last_poll_time: None,
        }
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    /// The most recently completed tick, or `None` before the first one.
    pub fn last_poll_time(&self) -> Option<DateTime<Utc>> {
        self.last_poll_time
    }

    /// The tick the next call to [`wait_until_next_tick`](Self::wait_until_next_tick)
    /// will wait for.
    ///
    /// Never earlier than one interval after the last completed tick, so
    /// ticks keep increasing even if the wall clock steps backwards.
    pub fn next_poll_time(&self) -> DateTime<Utc> {
        let interval_secs = self.interval.as_secs() as i64;
        let now_secs = ceil_unix_seconds(self.clock.now());
        let mut next = round_up_to_multiple(now_secs, interval_secs);
        if let Some(last) = self.last_poll_time {
            next = next.max(last.timestamp().saturating_add(interval_secs));
        }
        DateTime::<Utc>::from_timestamp(next, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Wait until the next tick, but no longer than `timeout`.
    ///
    /// Returns `true` once the tick has arrived, recording it as the last poll
    /// time. Returns `false` after waiting exactly `timeout` if the tick is
    /// still further away, leaving the scheduler state unchanged.
    pub async fn wait_until_next_tick(&mut self, timeout: Duration) -> Result<bool> {
        let target = self.next_poll_time();
        let remaining = (target - self.clock.now()).max(TimeDelta::zero());
        let timeout = TimeDelta::from_std(timeout)
            .map_err(|e| Error::invalid_argument(format!("invalid timeout: {}", e)))?;

        if remaining > timeout {
            self.clock.wait(timeout).await?;
            return Ok(false);
        }

        if remaining > TimeDelta::zero() {
            debug!(
                wait_ms = remaining.num_milliseconds(),
                tick = %target,
                "Waiting for poll tick"
            );
            self.clock.wait(remaining).await?;
        }
        self.last_poll_time = Some(target);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 4, 9, h, m, s).unwrap()
    }

    fn five_minute_scheduler(clock: &Arc<ManualClock>) -> Scheduler {
        Scheduler::new(clock.clone(), PollInterval::from_minutes(5).unwrap())
    }

    const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);

    #[test]
    fn test_zero_interval_rejected() {
        assert!(PollInterval::from_secs(0).is_err());
        assert!(PollInterval::try_from(Duration::from_millis(1500)).is_err());
        assert_eq!(
            PollInterval::try_from(Duration::from_secs(900))
                .unwrap()
                .as_secs(),
            900
        );
    }

    #[test]
    fn test_round_up_to_multiple() {
        assert_eq!(round_up_to_multiple(0, 300), 0);
        assert_eq!(round_up_to_multiple(1, 300), 300);
        assert_eq!(round_up_to_multiple(300, 300), 300);
        assert_eq!(round_up_to_multiple(301, 300), 600);
    }

    #[test]
    fn test_first_tick_is_smallest_multiple_not_before_now() {
        for interval in [1u64, 7, 60, 300, 900, 3600] {
            for offset in [0i64, 1, 59, 299, 3599, 86_399] {
                let start =
                    at(0, 0, 0) + TimeDelta::seconds(offset) + TimeDelta::milliseconds(250);
                let clock = ManualClock::shared(start);
                let scheduler =
                    Scheduler::new(clock.clone(), PollInterval::from_secs(interval).unwrap());

                let tick = scheduler.next_poll_time();
                let tick_secs = tick.timestamp();
                assert_eq!(tick_secs % interval as i64, 0);
                assert!(tick >= start);
                assert!(tick - TimeDelta::seconds(interval as i64) < start);
            }
        }
    }

    #[tokio::test]
    async fn test_wait_less_than_timeout_returns_true() {
        let clock = ManualClock::shared(at(11, 43, 29));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(scheduler.wait_until_next_tick(TEN_MINUTES).await.unwrap());
        // 11:43:29 -> 11:45:00
        assert_eq!(clock.last_wait(), Some(TimeDelta::seconds(91)));
    }

    #[tokio::test]
    async fn test_wait_more_than_timeout_returns_false() {
        let clock = ManualClock::shared(at(11, 43, 29));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(
            !scheduler
                .wait_until_next_tick(Duration::from_secs(90))
                .await
                .unwrap()
        );
        assert_eq!(clock.last_wait(), Some(TimeDelta::seconds(90)));
        assert_eq!(scheduler.last_poll_time(), None);
    }

    #[tokio::test]
    async fn test_wait_equal_to_timeout_returns_true() {
        let clock = ManualClock::shared(at(11, 43, 29));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(
            scheduler
                .wait_until_next_tick(Duration::from_secs(91))
                .await
                .unwrap()
        );
        assert_eq!(clock.last_wait(), Some(TimeDelta::seconds(91)));
    }

    #[tokio::test]
    async fn test_no_wait_on_interval_boundary() {
        let clock = ManualClock::shared(at(11, 45, 0));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(scheduler.wait_until_next_tick(TEN_MINUTES).await.unwrap());
        assert!(clock.waits().is_empty());
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 45, 0)));
    }

    #[tokio::test]
    async fn test_consecutive_calls_on_same_boundary_advance_one_interval() {
        let clock = ManualClock::shared(at(11, 45, 0));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(scheduler.wait_until_next_tick(TEN_MINUTES).await.unwrap());
        assert!(clock.waits().is_empty());

        assert!(scheduler.wait_until_next_tick(TEN_MINUTES).await.unwrap());
        assert_eq!(clock.last_wait(), Some(TimeDelta::minutes(5)));
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 50, 0)));
    }

    #[tokio::test]
    async fn test_last_poll_time_none_until_wait_completes() {
        let clock = ManualClock::shared(at(11, 43, 29));
        let mut scheduler = five_minute_scheduler(&clock);
        assert_eq!(scheduler.last_poll_time(), None);

        assert!(
            !scheduler
                .wait_until_next_tick(Duration::from_secs(30))
                .await
                .unwrap()
        );
        assert_eq!(scheduler.last_poll_time(), None);
    }

    #[tokio::test]
    async fn test_last_poll_time_updates_when_wait_completes() {
        let clock = ManualClock::shared(at(11, 43, 29));
        let mut scheduler = five_minute_scheduler(&clock);

        assert!(
            scheduler
                .wait_until_next_tick(Duration::from_secs(120))
                .await
                .unwrap()
        );
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 45, 0)));

        clock.set(at(11, 49, 29));
        assert!(
            scheduler
                .wait_until_next_tick(Duration::from_secs(120))
                .await
                .unwrap()
        );
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 50, 0)));
    }

    #[tokio::test]
    async fn test_idle_slices_converge_on_tick() {
        let clock = ManualClock::shared(at(11, 44, 58));
        let mut scheduler = five_minute_scheduler(&clock);
        let slice = Duration::from_millis(500);

        let mut timeouts = 0;
        while !scheduler.wait_until_next_tick(slice).await.unwrap() {
            timeouts += 1;
        }

        assert_eq!(timeouts, 3);
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 45, 0)));
        assert_eq!(clock.now(), at(11, 45, 0));
    }

    #[tokio::test]
    async fn test_clock_stepping_back_never_repeats_a_tick() {
        let clock = ManualClock::shared(at(11, 45, 0));
        let mut scheduler = five_minute_scheduler(&clock);
        assert!(scheduler.wait_until_next_tick(TEN_MINUTES).await.unwrap());
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 45, 0)));

        clock.set(at(11, 35, 0));
        assert_eq!(scheduler.next_poll_time(), at(11, 50, 0));

        // The whole gap is waited out rather than firing 11:35 or 11:40.
        assert!(
            !scheduler
                .wait_until_next_tick(Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(scheduler.wait_until_next_tick(TEN_MINUTES * 2).await.unwrap());
        assert_eq!(scheduler.last_poll_time(), Some(at(11, 50, 0)));
        assert_eq!(clock.now(), at(11, 50, 0));
    }
}
