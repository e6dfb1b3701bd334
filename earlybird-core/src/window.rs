use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// How far ahead of departure the airline opens check-in.
pub const CHECKIN_LEAD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Retry interval must be greater than zero")]
    ZeroRetryInterval,
    #[error("Check-in window must be greater than zero")]
    ZeroWindow,
    #[error("Duration out of range: {0:?}")]
    OutOfRange(Duration),
}

/// Timing policy for a flight's check-in attempts.
///
/// The first attempt fires `window` before the airline's 24-hour mark; failed attempts
/// are retried every `retry_interval` until the retry budget (twice the window,
/// measured in retry intervals) is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinWindow {
    lead: Duration,
    window: Duration,
    retry_interval: Duration,
}

impl CheckinWindow {
    pub fn new(window: Duration, retry_interval: Duration) -> Result<Self, WindowError> {
        if retry_interval.is_zero() {
            return Err(WindowError::ZeroRetryInterval);
        }
        if window.is_zero() {
            return Err(WindowError::ZeroWindow);
        }
        // Both go through chrono arithmetic later on.
        for d in [window, retry_interval] {
            chrono::Duration::from_std(d).map_err(|_| WindowError::OutOfRange(d))?;
        }
        Ok(Self {
            lead: CHECKIN_LEAD,
            window,
            retry_interval,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Instant of the first attempt: `departure - (24h + window)`.
    ///
    /// Computed on the UTC instant, so the result does not depend on the zone the
    /// departure is expressed in.
    pub fn trigger_for<Tz: TimeZone>(&self, departs_at: &DateTime<Tz>) -> DateTime<Utc> {
        departs_at.with_timezone(&Utc) - self.lead_with_window()
    }

    /// Number of retries a flight gets: `ceil(2 * window / retry_interval)`, at least one.
    pub fn retry_budget(&self) -> u32 {
        let budget = 2 * self.window.as_millis();
        let step = self.retry_interval.as_millis().max(1);
        let retries = budget.div_ceil(step).max(1);
        u32::try_from(retries).unwrap_or(u32::MAX - 1)
    }

    /// Total attempts before the flight is given up on: the first one plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget() + 1
    }

    /// Whether a failed attempt `attempt` (1-based) earns another try.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.retry_budget()
    }

    /// Trigger time of the attempt following a failure at `now`.
    pub fn next_attempt_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.retry_interval).unwrap_or(chrono::Duration::zero())
    }

    fn lead_with_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lead + self.window).unwrap_or(chrono::Duration::zero())
    }
}

impl Default for CheckinWindow {
    fn default() -> Self {
        Self {
            lead: CHECKIN_LEAD,
            window: Duration::from_secs(3 * 60),
            retry_interval: Duration::from_secs(5),
        }
    }
}
