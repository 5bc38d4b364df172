use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub reminders_enabled: bool,
    pub timezone: String,
}

// -- Reminders --

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub ran_at: DateTime<Utc>,
    /// Local wall-clock minute the cycle evaluated against, `YYYY-MM-DD HH:MM`.
    pub local_minute: String,
    pub candidates: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Sent, but the habit was deleted (or marked by someone else) before the write.
    pub vanished: usize,
    /// Sent, but the marker write failed.
    pub unmarked: usize,
    /// Wall-clock minutes that will get no cycle because this one ran past
    /// the end of its own minute.
    pub skipped_minutes: u32,
}
