//! Error types for the workflow crate.
//!
//! `SpecError` describes a single malformed field of a trigger
//! specification. The validator turns these into field-level messages;
//! the scheduler wraps them in its own error when asked to evaluate a spec
//! that never went through validation.

use std::fmt;

/// A malformed value inside a recurrence specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Time of day is not a 24-hour `HH:MM` string.
    InvalidTime { value: String },
    /// Weekday number outside 1 (Monday) ..= 7 (Sunday).
    InvalidWeekday { value: u8 },
    /// Day of month outside 1..=31.
    InvalidDayOfMonth { value: u32 },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime { value } => {
                write!(f, "invalid time '{value}': expected 24-hour HH:MM")
            }
            Self::InvalidWeekday { value } => {
                write!(f, "invalid weekday {value}: expected 1 (Monday) to 7 (Sunday)")
            }
            Self::InvalidDayOfMonth { value } => {
                write!(f, "invalid day of month {value}: expected 1 to 31")
            }
        }
    }
}

impl std::error::Error for SpecError {}
