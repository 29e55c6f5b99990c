//! Cron translation of recurrence specs.
//!
//! Produces five-field expressions (`minute hour day-of-month month
//! day-of-week`) for schedulers that only understand cron. Two mappings are
//! lossy: second intervals are rounded up to whole minutes, and "last day
//! of month" uses the non-standard `L` token.

use crate::error::ScheduleError;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tracing::debug;
use varflow_core::Result;
use varflow_workflow::recurrence::parse_time;
use varflow_workflow::{DayOfMonth, IntervalUnit, RecurrenceSpec, ScheduledRecurrence};

/// Translates a recurrence into a cron expression. Never fails: specs that
/// would not pass validation still map to some expression.
#[must_use]
pub fn to_cron(spec: &RecurrenceSpec) -> String {
    match spec {
        RecurrenceSpec::Interval { amount, unit } => {
            let amount = (*amount).max(1);
            match unit {
                IntervalUnit::Second => format!("*/{} * * * *", amount.div_ceil(60)),
                IntervalUnit::Minute => format!("*/{amount} * * * *"),
                IntervalUnit::Hour => format!("0 */{amount} * * *"),
                IntervalUnit::Day => format!("0 0 */{amount} * *"),
            }
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Hourly {
            hourly_interval,
            minute_of_hour,
        }) => {
            let hour = if *hourly_interval <= 1 {
                "*".to_string()
            } else {
                format!("*/{hourly_interval}")
            };
            format!("{minute_of_hour} {hour} * * *")
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Daily { time, days_of_week }) => {
            let (hour, minute) = hour_minute(time);
            format!("{minute} {hour} * * {}", day_of_week_field(days_of_week))
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Weekly { time, day_of_week }) => {
            let (hour, minute) = hour_minute(time);
            format!("{minute} {hour} * * {}", cron_weekday(*day_of_week))
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Monthly {
            time, day_of_month, ..
        }) => {
            let (hour, minute) = hour_minute(time);
            let day = match day_of_month {
                DayOfMonth::First => "1".to_string(),
                DayOfMonth::Last => "L".to_string(),
                DayOfMonth::Day(day) => day.to_string(),
            };
            format!("{minute} {hour} {day} * *")
        }
    }
}

/// Monday = 1 .. Sunday = 7 to cron's Sunday = 0 .. Saturday = 6.
fn cron_weekday(day: u8) -> u8 {
    if day == 7 { 0 } else { day }
}

fn day_of_week_field(days_of_week: &[u8]) -> String {
    let mut days: Vec<u8> = days_of_week
        .iter()
        .copied()
        .filter(|day| (1..=7).contains(day))
        .collect();
    days.sort_unstable();
    days.dedup();
    if days.is_empty() || days.len() == 7 {
        return "*".to_string();
    }
    days.into_iter()
        .map(|day| cron_weekday(day).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn hour_minute(time: &str) -> (u32, u32) {
    match parse_time(time) {
        Ok(time) => (time.hour(), time.minute()),
        Err(e) => {
            debug!(error = %e, "unparsable time in cron translation, using midnight");
            (0, 0)
        }
    }
}

/// A cron expression together with the zone it is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    /// The cron expression.
    pub expression: String,
    /// Timezone for evaluation.
    pub timezone: Option<String>,
}

impl CronSchedule {
    /// Creates a schedule from a raw expression.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            timezone: None,
        }
    }

    /// Translates a recurrence spec.
    #[must_use]
    pub fn from_recurrence(spec: &RecurrenceSpec) -> Self {
        Self::new(to_cron(spec))
    }

    /// Sets the timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Checks that the expression has five fields.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidCronExpression`] otherwise.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let fields = self.expression.split_whitespace().count();
        if fields != 5 {
            return Err(ScheduleError::InvalidCronExpression {
                expression: self.expression.clone(),
                reason: format!("expected 5 fields, got {fields}"),
            }
            .into());
        }
        Ok(())
    }
}
