pub mod api;
pub mod models;

pub use models::{ReminderCandidate, Reward, TimeOfDay, TimeOfDayError};
