//! Error types for the scheduler crate.
//!
//! Errors are reported through rootcause (`varflow_core::Result`). A spec
//! that passed validation never produces `InvalidSpec`; the other variants
//! signal calendar limits.

use std::fmt;
use varflow_workflow::SpecError;

/// Errors from schedule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The recurrence spec is structurally invalid.
    InvalidSpec { reason: String },
    /// No monthly occurrence within the lookahead window.
    NoOccurrence { months_searched: u32 },
    /// The next occurrence is outside the representable date range.
    OutOfRange,
    /// Invalid cron expression.
    InvalidCronExpression { expression: String, reason: String },
}

impl ScheduleError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            reason: reason.into(),
        }
    }
}

impl From<SpecError> for ScheduleError {
    fn from(err: SpecError) -> Self {
        Self::invalid(err.to_string())
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpec { reason } => write!(f, "invalid recurrence: {reason}"),
            Self::NoOccurrence { months_searched } => {
                write!(f, "no occurrence within {months_searched} months")
            }
            Self::OutOfRange => write!(f, "next occurrence is out of range"),
            Self::InvalidCronExpression { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}
