use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local wall-clock hour:minute at which a habit's reminder fires.
/// Carries no offset; it is read in the server's configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeOfDayError {
    #[error("time of day must look like HH:MM, got {0:?}")]
    Format(String),
    #[error("time of day out of range: {hour:02}:{minute:02}")]
    Range { hour: u32, minute: u32 },
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, TimeOfDayError> {
        if hour > 23 || minute > 59 {
            return Err(TimeOfDayError::Range {
                hour: hour.into(),
                minute: minute.into(),
            });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// True when `time` falls inside this minute. Seconds are ignored.
    pub fn matches(&self, time: NaiveTime) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // NaiveTime guarantees hour < 24 and minute < 60
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| TimeOfDayError::Format(s.to_string()))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(TimeOfDayError::Format(s.to_string()));
        }
        let hour: u32 = h.parse().map_err(|_| TimeOfDayError::Format(s.to_string()))?;
        let minute: u32 = m.parse().map_err(|_| TimeOfDayError::Format(s.to_string()))?;
        if hour > 23 || minute > 59 {
            return Err(TimeOfDayError::Range { hour, minute });
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeOfDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// What the user gets for completing a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reward {
    /// Free-form reward text.
    Text(String),
    /// Action of the linked pleasant habit.
    PleasantHabit(String),
}

/// A habit whose owner has a delivery target, flattened with everything the
/// reminder needs to decide and render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCandidate {
    pub habit_id: Uuid,
    /// Telegram chat id of the owner.
    pub recipient: i64,
    pub time_of_day: TimeOfDay,
    pub periodicity_days: u8,
    pub last_served_at: Option<DateTime<Utc>>,
    pub action: String,
    pub place: String,
    pub duration_seconds: u16,
    pub reward: Option<Reward>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_time_of_day() {
        let t: TimeOfDay = "07:05".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 5));
        assert_eq!(t.to_string(), "07:05");
        assert_eq!("9:30".parse::<TimeOfDay>().unwrap().to_string(), "09:30");
    }

    #[test]
    fn rejects_bad_time_of_day() {
        assert!(matches!("24:00".parse::<TimeOfDay>(), Err(TimeOfDayError::Range { .. })));
        assert!(matches!("12:60".parse::<TimeOfDay>(), Err(TimeOfDayError::Range { .. })));
        assert!(matches!("1230".parse::<TimeOfDay>(), Err(TimeOfDayError::Format(_))));
        assert!(matches!("12:3".parse::<TimeOfDay>(), Err(TimeOfDayError::Format(_))));
        assert!(TimeOfDay::new(23, 59).is_ok());
        assert!(TimeOfDay::new(23, 60).is_err());
    }

    #[test]
    fn matches_ignores_seconds() {
        let t = TimeOfDay::new(12, 30).unwrap();
        assert!(t.matches(NaiveTime::from_hms_opt(12, 30, 59).unwrap()));
        assert!(!t.matches(NaiveTime::from_hms_opt(12, 31, 0).unwrap()));
        assert!(!t.matches(NaiveTime::from_hms_opt(13, 30, 0).unwrap()));
    }

    #[test]
    fn time_of_day_serializes_as_string() {
        let t = TimeOfDay::new(8, 0).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"08:00\"");
        let back: TimeOfDay = serde_json::from_str("\"08:00\"").unwrap();
        assert_eq!(back, t);
    }
}
