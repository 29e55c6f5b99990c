//! Scheduling for varflow timer triggers.
//!
//! This crate provides:
//!
//! - **Schedule calculator**: the next wall-clock instant a recurrence
//!   fires, relative to an explicitly supplied "now"
//! - **Cron translation**: five-field cron expressions for backend
//!   schedulers

pub mod cron;
pub mod error;
pub mod schedule;

pub use cron::{CronSchedule, to_cron};
pub use error::ScheduleError;
pub use schedule::{ScheduleCalculator, ScheduleOptions, next_fire_time};
