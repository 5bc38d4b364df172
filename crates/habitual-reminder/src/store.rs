use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use habitual_db::models::ReminderRow;
use habitual_db::{Database, parse_db_timestamp};
use habitual_types::{ReminderCandidate, Reward, TimeOfDay};

/// What the dispatch cycle needs from habit storage.
pub trait ReminderStore: Send + Sync {
    /// Habits whose owner has a delivery target. `slot` lets the store narrow
    /// the scan to one minute; returning extra rows is allowed.
    fn list_candidates(&self, slot: TimeOfDay) -> Result<Vec<ReminderCandidate>>;

    /// Conditioned write of the delivery marker. `Ok(false)` when the habit is
    /// gone or already carries a later marker.
    fn try_mark_served(&self, habit_id: Uuid, served_at: DateTime<Utc>) -> Result<bool>;
}

impl ReminderStore for Database {
    fn list_candidates(&self, slot: TimeOfDay) -> Result<Vec<ReminderCandidate>> {
        let rows = self.list_reminder_candidates(Some(slot))?;
        Ok(rows.into_iter().filter_map(candidate_from_row).collect())
    }

    fn try_mark_served(&self, habit_id: Uuid, served_at: DateTime<Utc>) -> Result<bool> {
        Database::try_mark_served(self, &habit_id.to_string(), served_at)
    }
}

/// Corrupt rows are logged and left out rather than failing the whole cycle.
fn candidate_from_row(row: ReminderRow) -> Option<ReminderCandidate> {
    let habit_id: Uuid = row
        .habit_id
        .parse()
        .map_err(|e| warn!("Corrupt habit id '{}': {}", row.habit_id, e))
        .ok()?;
    let time_of_day: TimeOfDay = row
        .time_of_day
        .parse()
        .map_err(|e| warn!("Corrupt time_of_day on habit '{}': {}", row.habit_id, e))
        .ok()?;
    let periodicity_days = match u8::try_from(row.periodicity_days) {
        Ok(days @ 1..=7) => days,
        _ => {
            warn!("Periodicity {} out of range on habit '{}'", row.periodicity_days, row.habit_id);
            return None;
        }
    };
    let duration_seconds = match u16::try_from(row.duration_seconds) {
        Ok(secs @ 0..=120) => secs,
        _ => {
            warn!("Duration {} out of range on habit '{}'", row.duration_seconds, row.habit_id);
            return None;
        }
    };
    let last_served_at = match row.last_served_at.as_deref().map(parse_db_timestamp) {
        None => None,
        Some(Ok(at)) => Some(at),
        Some(Err(e)) => {
            warn!("Corrupt last_served_at on habit '{}': {}", row.habit_id, e);
            return None;
        }
    };

    let reward = if !row.reward.trim().is_empty() {
        Some(Reward::Text(row.reward))
    } else {
        row.related_action.map(Reward::PleasantHabit)
    };

    Some(ReminderCandidate {
        habit_id,
        recipient: row.chat_id,
        time_of_day,
        periodicity_days,
        last_served_at,
        action: row.action,
        place: row.place,
        duration_seconds,
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ReminderRow {
        ReminderRow {
            habit_id: "6f1c2d0e-0000-4000-8000-000000000001".into(),
            chat_id: 77,
            time_of_day: "12:30".into(),
            periodicity_days: 2,
            last_served_at: Some("2026-01-01T12:30:00Z".into()),
            action: "walk".into(),
            place: "home".into(),
            duration_seconds: 60,
            reward: String::new(),
            related_action: None,
        }
    }

    #[test]
    fn converts_a_clean_row() {
        let c = candidate_from_row(row()).unwrap();
        assert_eq!(c.recipient, 77);
        assert_eq!(c.time_of_day, TimeOfDay::new(12, 30).unwrap());
        assert_eq!(c.periodicity_days, 2);
        assert_eq!(
            c.last_served_at.map(habitual_db::to_db_timestamp).as_deref(),
            Some("2026-01-01T12:30:00Z")
        );
        assert_eq!(c.reward, None);
    }

    #[test]
    fn explicit_reward_wins_over_pleasant_habit() {
        let mut r = row();
        r.reward = "cake".into();
        r.related_action = Some("nap".into());
        assert_eq!(candidate_from_row(r).unwrap().reward, Some(Reward::Text("cake".into())));

        let mut r = row();
        r.related_action = Some("nap".into());
        assert_eq!(
            candidate_from_row(r).unwrap().reward,
            Some(Reward::PleasantHabit("nap".into()))
        );
    }

    #[test]
    fn corrupt_rows_are_dropped() {
        let mut r = row();
        r.time_of_day = "noon".into();
        assert!(candidate_from_row(r).is_none());

        let mut r = row();
        r.periodicity_days = 0;
        assert!(candidate_from_row(r).is_none());

        let mut r = row();
        r.last_served_at = Some("yesterday".into());
        assert!(candidate_from_row(r).is_none());
    }

    #[test]
    fn out_of_range_duration_drops_the_row() {
        let mut r = row();
        r.duration_seconds = -5;
        assert!(candidate_from_row(r).is_none());

        let mut r = row();
        r.duration_seconds = 70_000;
        assert!(candidate_from_row(r).is_none());

        let mut r = row();
        r.duration_seconds = 120;
        assert_eq!(candidate_from_row(r).unwrap().duration_seconds, 120);
    }

    #[test]
    fn offset_marker_drops_the_row() {
        let mut r = row();
        r.last_served_at = Some("2026-01-01T15:30:00+03:00".into());
        assert!(candidate_from_row(r).is_none());
    }
}
