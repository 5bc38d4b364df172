use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use habitual_types::api::CycleReport;

use crate::dispatch::Dispatcher;
use crate::error::CycleError;
use crate::store::ReminderStore;

/// Seconds past the minute boundary at which a cycle starts, so a slightly
/// early wake-up never evaluates the previous minute.
const TICK_OFFSET_SECS: u64 = 1;

/// Background trigger for dispatch cycles: once per wall-clock minute, in the
/// configured zone, one cycle at a time.
pub struct ReminderScheduler<S> {
    dispatcher: Arc<Dispatcher<S>>,
    tz: Tz,
    last_report: Arc<RwLock<Option<CycleReport>>>,
    running: Arc<Mutex<()>>,
}

impl<S> Clone for ReminderScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            tz: self.tz,
            last_report: self.last_report.clone(),
            running: self.running.clone(),
        }
    }
}

impl<S> ReminderScheduler<S>
where
    S: ReminderStore + 'static,
{
    pub fn new(dispatcher: Dispatcher<S>, tz: Tz) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            tz,
            last_report: Arc::new(RwLock::new(None)),
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Report of the most recent completed cycle, if any.
    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Run one cycle at `now` unless another one is still in flight.
    ///
    /// The report's `skipped_minutes` counts the minutes the cycle overran,
    /// measured from `now` plus the time the cycle actually took.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let _guard = self.running.try_lock().map_err(|_| CycleError::AlreadyRunning)?;

        let started = Instant::now();
        let mut report = self
            .dispatcher
            .run_cycle_report(now.with_timezone(&self.tz))
            .await?;
        let finished = TimeDelta::from_std(started.elapsed())
            .ok()
            .and_then(|elapsed| now.checked_add_signed(elapsed))
            .unwrap_or(now);
        report.skipped_minutes = skipped_minutes(now, finished);
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// Tick at the start of every minute until `shutdown` resolves.
    /// Store outages are logged and retried on the next tick.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Reminder scheduler started (timezone {})", self.tz);

        loop {
            match self.run_once_at(Utc::now()).await {
                Ok(report) if report.skipped_minutes > 0 => {
                    warn!(
                        "Reminder cycle {} overran; {} minute(s) after it will not be evaluated",
                        report.local_minute, report.skipped_minutes
                    );
                }
                Ok(_) => {}
                Err(CycleError::AlreadyRunning) => {
                    warn!("Previous reminder cycle still running, skipping this tick");
                }
                Err(e) => {
                    warn!("Reminder cycle error: {}", e);
                }
            }

            let delay = next_tick_delay(Utc::now());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("Reminder scheduler stopped");
                    return;
                }
            }
        }
    }
}

/// Time until `TICK_OFFSET_SECS` past the next minute boundary.
pub fn next_tick_delay(now: DateTime<Utc>) -> Duration {
    // nanosecond() exceeds 1e9 during a leap second
    let nanos = now.nanosecond() % 1_000_000_000;
    let into_minute = Duration::new(u64::from(now.second()), nanos);
    Duration::from_secs(60 + TICK_OFFSET_SECS).saturating_sub(into_minute)
}

/// Whole minutes between the minute a cycle started in and the minute it
/// finished in. The next tick lands after the finishing minute, so each of
/// them goes unevaluated.
pub fn skipped_minutes(started: DateTime<Utc>, finished: DateTime<Utc>) -> u32 {
    let gap = finished.timestamp().div_euclid(60) - started.timestamp().div_euclid(60);
    u32::try_from(gap.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_tick_lands_just_after_the_minute() {
        let at = |s: u32, ms: u32| {
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, s).unwrap()
                + chrono::Duration::milliseconds(i64::from(ms))
        };
        assert_eq!(next_tick_delay(at(0, 0)), Duration::from_secs(61));
        assert_eq!(next_tick_delay(at(1, 0)), Duration::from_secs(60));
        assert_eq!(next_tick_delay(at(1, 250)), Duration::from_millis(59_750));
        assert_eq!(next_tick_delay(at(59, 500)), Duration::from_millis(1_500));
    }

    #[test]
    fn skipped_minutes_counts_overrun_boundaries() {
        let at = |m: u32, s: u32| Utc.with_ymd_and_hms(2026, 1, 1, 12, m, s).unwrap();
        assert_eq!(skipped_minutes(at(30, 1), at(30, 59)), 0);
        // 12:30:01 + 70s: next tick is 12:32:01, so 12:31 is lost
        assert_eq!(skipped_minutes(at(30, 1), at(31, 11)), 1);
        assert_eq!(skipped_minutes(at(30, 1), at(33, 0)), 3);
        assert_eq!(skipped_minutes(at(31, 0), at(30, 0)), 0);
    }
}
