use chrono::{DateTime, Utc};
use habitual_types::TimeOfDay;

/// Database row types. These map directly to SQLite rows.
/// Distinct from habitual-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub telegram_chat_id: Option<i64>,
    pub created_at: String,
}

pub struct HabitRow {
    pub id: String,
    pub user_id: String,
    pub place: String,
    pub time_of_day: String,
    pub action: String,
    pub is_pleasant: bool,
    pub related_habit_id: Option<String>,
    pub periodicity_days: i64,
    pub reward: String,
    pub duration_seconds: i64,
    pub is_public: bool,
    pub last_served_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A habit joined with its owner's chat id and the linked pleasant habit's action.
pub struct ReminderRow {
    pub habit_id: String,
    pub chat_id: i64,
    pub time_of_day: String,
    pub periodicity_days: i64,
    pub last_served_at: Option<String>,
    pub action: String,
    pub place: String,
    pub duration_seconds: i64,
    pub reward: String,
    pub related_action: Option<String>,
}

/// Insert payload for a habit. Validation of field combinations happens
/// upstream; the schema only enforces ranges. Time fields are typed so they
/// are always written in their canonical text form.
pub struct NewHabit<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub place: &'a str,
    pub time_of_day: TimeOfDay,
    pub action: &'a str,
    pub is_pleasant: bool,
    pub related_habit_id: Option<&'a str>,
    pub periodicity_days: u8,
    pub reward: &'a str,
    pub duration_seconds: u16,
    pub is_public: bool,
    pub last_served_at: Option<DateTime<Utc>>,
}
