//! Habitual reminder engine.
//!
//! Decides which habits are due at the current local minute, sends one
//! notification per due habit, and records the delivery so the same
//! occurrence is never sent twice:
//! - `recurrence`: pure due-ness check (minute slot + whole-day periodicity)
//! - `dispatch`: one evaluate/send/mark sweep over all candidates
//! - `gateway`: outbound notification sink (Telegram Bot API)
//! - `scheduler`: minute-aligned trigger loop
//!
//! Only one sweep may run at a time across all processes sharing a database;
//! the scheduler enforces this within a process, deployments must ensure it
//! across processes.

pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod recurrence;
pub mod scheduler;
pub mod store;
pub mod text;

pub use dispatch::Dispatcher;
pub use error::{CycleError, SendError};
pub use gateway::{Ack, NotificationGateway, TelegramConfig, TelegramGateway};
pub use recurrence::is_due;
pub use scheduler::ReminderScheduler;
pub use store::ReminderStore;
