use crate::models::{HabitRow, NewHabit, ReminderRow, UserRow};
use crate::{Database, to_db_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use habitual_types::TimeOfDay;
use rusqlite::{Connection, OptionalExtension, Row, params};

const HABIT_COLUMNS: &str = "id, user_id, place, time_of_day, action, is_pleasant, related_habit_id,
    periodicity_days, reward, duration_seconds, is_public, last_served_at, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO users (id, username) VALUES (?1, ?2)", (id, username))?;
            Ok(())
        })
    }

    /// Link (or unlink, with `None`) a Telegram chat to a user.
    /// Returns false if the user does not exist.
    pub fn set_telegram_chat_id(&self, user_id: &str, chat_id: Option<i64>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET telegram_chat_id = ?1 WHERE id = ?2",
                params![chat_id, user_id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, telegram_chat_id, created_at FROM users WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            telegram_chat_id: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Habits --

    pub fn create_habit(&self, habit: &NewHabit<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (id, user_id, place, time_of_day, action, is_pleasant,
                    related_habit_id, periodicity_days, reward, duration_seconds, is_public,
                    last_served_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    habit.id,
                    habit.user_id,
                    habit.place,
                    habit.time_of_day.to_string(),
                    habit.action,
                    habit.is_pleasant,
                    habit.related_habit_id,
                    habit.periodicity_days,
                    habit.reward,
                    habit.duration_seconds,
                    habit.is_public,
                    habit.last_served_at.map(to_db_timestamp),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_habit(&self, id: &str) -> Result<Option<HabitRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1");
            let row = conn.query_row(&sql, [id], habit_from_row).optional()?;
            Ok(row)
        })
    }

    /// Change when a habit fires. Returns false if the habit is gone.
    pub fn update_habit_schedule(
        &self,
        id: &str,
        time_of_day: TimeOfDay,
        periodicity_days: u8,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE habits SET time_of_day = ?1, periodicity_days = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![time_of_day.to_string(), periodicity_days, to_db_timestamp(Utc::now()), id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_habit(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM habits WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }

    // -- Reminders --

    /// Habits whose owner has a Telegram chat linked. `time_of_day` narrows the
    /// scan to one `HH:MM` slot; callers still re-check due-ness.
    pub fn list_reminder_candidates(
        &self,
        time_of_day: Option<TimeOfDay>,
    ) -> Result<Vec<ReminderRow>> {
        let slot = time_of_day.map(|t| t.to_string());
        self.with_conn(|conn| query_reminder_candidates(conn, slot.as_deref()))
    }

    /// Advance `last_served_at` to `served_at` in one conditioned write.
    ///
    /// Returns false (not an error) when the habit no longer exists or a later
    /// marker is already stored. Re-marking with the same instant succeeds, so
    /// the marker never moves backwards and repeated writes are harmless.
    pub fn try_mark_served(&self, habit_id: &str, served_at: DateTime<Utc>) -> Result<bool> {
        let served_at = to_db_timestamp(served_at);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE habits SET last_served_at = ?1, updated_at = ?2
                 WHERE id = ?3 AND (last_served_at IS NULL OR last_served_at <= ?1)",
                params![served_at, to_db_timestamp(Utc::now()), habit_id],
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_reminder_candidates(
    conn: &Connection,
    time_of_day: Option<&str>,
) -> Result<Vec<ReminderRow>> {
    // JOIN owner + pleasant habit in a single query (no per-habit lookups)
    let mut stmt = conn.prepare(
        "SELECT h.id, u.telegram_chat_id, h.time_of_day, h.periodicity_days, h.last_served_at,
                h.action, h.place, h.duration_seconds, h.reward, rh.action
         FROM habits h
         JOIN users u ON u.id = h.user_id
         LEFT JOIN habits rh ON rh.id = h.related_habit_id
         WHERE u.telegram_chat_id IS NOT NULL
           AND (?1 IS NULL OR h.time_of_day = ?1)
         ORDER BY h.created_at, h.id",
    )?;

    let rows = stmt
        .query_map([time_of_day], |row| {
            Ok(ReminderRow {
                habit_id: row.get(0)?,
                chat_id: row.get(1)?,
                time_of_day: row.get(2)?,
                periodicity_days: row.get(3)?,
                last_served_at: row.get(4)?,
                action: row.get(5)?,
                place: row.get(6)?,
                duration_seconds: row.get(7)?,
                reward: row.get(8)?,
                related_action: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        place: row.get(2)?,
        time_of_day: row.get(3)?,
        action: row.get(4)?,
        is_pleasant: row.get(5)?,
        related_habit_id: row.get(6)?,
        periodicity_days: row.get(7)?,
        reward: row.get(8)?,
        duration_seconds: row.get(9)?,
        is_public: row.get(10)?,
        last_served_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
