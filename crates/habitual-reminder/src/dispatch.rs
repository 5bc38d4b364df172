use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use habitual_types::api::CycleReport;
use habitual_types::{ReminderCandidate, TimeOfDay};

use crate::error::{CycleError, SendError};
use crate::gateway::NotificationGateway;
use crate::recurrence::is_due;
use crate::store::ReminderStore;
use crate::text;

/// Sends allowed in flight at once within one cycle.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Runs dispatch cycles: evaluate every candidate, send the due ones, and
/// advance the delivery marker of each habit whose send succeeded.
pub struct Dispatcher<S> {
    store: Arc<S>,
    gateway: Arc<dyn NotificationGateway>,
    send_timeout: Duration,
    max_in_flight: usize,
}

/// How one due habit ended up.
enum Delivery {
    Failed,
    Marked,
    /// Sent, but the conditioned write matched no row.
    Vanished,
    /// Sent, but the marker write errored.
    Unmarked,
}

impl<S> Dispatcher<S>
where
    S: ReminderStore + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<dyn NotificationGateway>, send_timeout: Duration) -> Self {
        Self {
            store,
            gateway,
            send_timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Cap on concurrent sends. Values below 1 are treated as 1.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// One sweep at local instant `now`. Returns how many reminders went out.
    pub async fn run_cycle(&self, now: DateTime<Tz>) -> Result<usize, CycleError> {
        Ok(self.run_cycle_report(now).await?.sent)
    }

    /// Same as [`run_cycle`](Self::run_cycle) with the full per-cycle tally.
    ///
    /// Due habits are delivered concurrently, at most `max_in_flight` at a
    /// time. Each habit is sent and then marked, committed independently of
    /// the others. A send failure skips that habit only; only a failed
    /// candidate read aborts the cycle.
    pub async fn run_cycle_report(&self, now: DateTime<Tz>) -> Result<CycleReport, CycleError> {
        let tz = now.timezone();
        let local_now = now.naive_local();
        let served_at = now.with_timezone(&Utc);
        let slot = TimeOfDay::from(local_now.time());

        let store = self.store.clone();
        let candidates = tokio::task::spawn_blocking(move || store.list_candidates(slot))
            .await
            .map_err(|e| CycleError::StoreUnavailable(anyhow::anyhow!("candidate query task failed: {}", e)))?
            .map_err(CycleError::StoreUnavailable)?;

        let mut report = CycleReport {
            ran_at: served_at,
            local_minute: local_now.format("%Y-%m-%d %H:%M").to_string(),
            candidates: candidates.len(),
            ..CycleReport::default()
        };
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut in_flight = JoinSet::new();

        for candidate in candidates {
            if !seen.insert(candidate.habit_id) {
                continue;
            }

            let last_local = candidate
                .last_served_at
                .map(|at| at.with_timezone(&tz).naive_local());
            if !is_due(local_now, candidate.time_of_day, candidate.periodicity_days, last_local) {
                continue;
            }
            report.due += 1;

            if in_flight.len() >= self.max_in_flight {
                if let Some(joined) = in_flight.join_next().await {
                    tally(&mut report, joined);
                }
            }
            in_flight.spawn(deliver(
                self.store.clone(),
                self.gateway.clone(),
                self.send_timeout,
                candidate,
                served_at,
            ));
        }

        while let Some(joined) = in_flight.join_next().await {
            tally(&mut report, joined);
        }

        if report.due > 0 {
            info!(
                "Reminder cycle {}: {} candidates, {} due, {} sent, {} failed",
                report.local_minute, report.candidates, report.due, report.sent, report.failed
            );
        } else {
            debug!("Reminder cycle {}: nothing due", report.local_minute);
        }
        Ok(report)
    }
}

/// Send one reminder, then advance its marker. The marker is only written
/// after the send succeeded.
async fn deliver<S>(
    store: Arc<S>,
    gateway: Arc<dyn NotificationGateway>,
    send_timeout: Duration,
    candidate: ReminderCandidate,
    served_at: DateTime<Utc>,
) -> Delivery
where
    S: ReminderStore + 'static,
{
    let body = text::render(&candidate);
    let sending = gateway.send(candidate.recipient, &body);
    let outcome = match tokio::time::timeout(send_timeout, sending).await {
        Ok(outcome) => outcome,
        Err(_) => Err(SendError::Timeout(send_timeout)),
    };

    match outcome {
        Ok(ack) => {
            debug!(
                "Reminder sent for habit {} (message_id={:?})",
                candidate.habit_id, ack.message_id
            );
        }
        Err(e) => {
            warn!("Reminder for habit {} not sent: {}", candidate.habit_id, e);
            return Delivery::Failed;
        }
    }

    let habit_id = candidate.habit_id;
    let marked = tokio::task::spawn_blocking(move || store.try_mark_served(habit_id, served_at))
        .await
        .map_err(|e| anyhow::anyhow!("mark task failed: {}", e))
        .and_then(|r| r);

    match marked {
        Ok(true) => Delivery::Marked,
        Ok(false) => {
            debug!("Habit {} vanished or was marked later; marker left as is", habit_id);
            Delivery::Vanished
        }
        Err(e) => {
            error!("Reminder for habit {} sent but marker not saved: {:#}", habit_id, e);
            Delivery::Unmarked
        }
    }
}

fn tally(report: &mut CycleReport, joined: Result<Delivery, JoinError>) {
    match joined {
        Ok(Delivery::Failed) => report.failed += 1,
        Ok(Delivery::Marked) => report.sent += 1,
        Ok(Delivery::Vanished) => {
            report.sent += 1;
            report.vanished += 1;
        }
        Ok(Delivery::Unmarked) => {
            report.sent += 1;
            report.unmarked += 1;
        }
        Err(e) => {
            // Whether the send went out is unknown; the marker was not written
            error!("Reminder delivery task died: {}", e);
            report.failed += 1;
        }
    }
}
