//! Declarative recurrence specifications for timer triggers.
//!
//! A [`RecurrenceSpec`] is either a fixed interval or a calendar schedule
//! (hourly, daily, weekly, monthly). The types here only describe a
//! schedule; evaluating one lives in the scheduler crate.

use crate::error::SpecError;
use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// A repeating timer description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceSpec {
    /// Fire every `amount` units, counted from the reference instant.
    Interval {
        /// Number of units between firings. Must be positive.
        amount: u32,
        /// Unit of `amount`.
        unit: IntervalUnit,
    },
    /// Fire on a calendar schedule.
    Scheduled(ScheduledRecurrence),
}

impl RecurrenceSpec {
    /// Every `amount` units.
    #[must_use]
    pub const fn every(amount: u32, unit: IntervalUnit) -> Self {
        Self::Interval { amount, unit }
    }

    /// Every `hourly_interval` hours at `minute_of_hour`.
    #[must_use]
    pub const fn hourly(hourly_interval: u32, minute_of_hour: u32) -> Self {
        Self::Scheduled(ScheduledRecurrence::Hourly {
            hourly_interval,
            minute_of_hour,
        })
    }

    /// At `time` on the given weekdays (empty for every day).
    #[must_use]
    pub fn daily(time: impl Into<String>, days_of_week: Vec<u8>) -> Self {
        Self::Scheduled(ScheduledRecurrence::Daily {
            time: time.into(),
            days_of_week,
        })
    }

    /// At `time` once a week on `day_of_week`.
    #[must_use]
    pub fn weekly(time: impl Into<String>, day_of_week: u8) -> Self {
        Self::Scheduled(ScheduledRecurrence::Weekly {
            time: time.into(),
            day_of_week,
        })
    }

    /// At `time` once a month.
    #[must_use]
    pub fn monthly(
        time: impl Into<String>,
        day_of_month: DayOfMonth,
        monthly_fallback: Option<MonthlyFallback>,
    ) -> Self {
        Self::Scheduled(ScheduledRecurrence::Monthly {
            time: time.into(),
            day_of_month,
            monthly_fallback,
        })
    }
}

/// Unit of an interval recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl IntervalUnit {
    /// Converts `amount` of this unit to a duration.
    #[must_use]
    pub fn duration(self, amount: u32) -> Duration {
        let amount = i64::from(amount);
        match self {
            Self::Second => Duration::seconds(amount),
            Self::Minute => Duration::minutes(amount),
            Self::Hour => Duration::hours(amount),
            Self::Day => Duration::days(amount),
        }
    }
}

/// Calendar-based schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "repeat_mode", rename_all = "snake_case")]
pub enum ScheduledRecurrence {
    /// Every `hourly_interval` hours (aligned to midnight) at a fixed minute.
    Hourly {
        /// 1..=24.
        hourly_interval: u32,
        /// 0..=59.
        minute_of_hour: u32,
    },
    /// Once a day at `time`, optionally restricted to some weekdays.
    Daily {
        /// `HH:MM`, 24-hour.
        time: String,
        /// 1 = Monday .. 7 = Sunday. Empty or all seven means every day.
        #[serde(default)]
        days_of_week: Vec<u8>,
    },
    /// Once a week.
    Weekly {
        /// `HH:MM`, 24-hour.
        time: String,
        /// 1 = Monday .. 7 = Sunday.
        day_of_week: u8,
    },
    /// Once a month.
    Monthly {
        /// `HH:MM`, 24-hour.
        time: String,
        /// Which day of the month.
        day_of_month: DayOfMonth,
        /// Required when `day_of_month` is a number of 29 or more.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        monthly_fallback: Option<MonthlyFallback>,
    },
}

/// Day selector for monthly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DayOfMonthRepr", into = "DayOfMonthRepr")]
pub enum DayOfMonth {
    /// The first day of the month.
    First,
    /// The last calendar day of the month.
    Last,
    /// A literal day, 1..=31.
    Day(u32),
}

impl DayOfMonth {
    /// Returns whether some months lack this day, so a fallback is needed.
    #[must_use]
    pub const fn needs_fallback(self) -> bool {
        matches!(self, Self::Day(day) if day >= 29)
    }

    /// Checks that a literal day lies in 1..=31.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidDayOfMonth`] otherwise.
    pub fn check(self) -> Result<(), SpecError> {
        match self {
            Self::Day(value) if !(1..=31).contains(&value) => {
                Err(SpecError::InvalidDayOfMonth { value })
            }
            Self::First | Self::Last | Self::Day(_) => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DayOfMonthRepr {
    Number(u32),
    Named(NamedDay),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedDay {
    First,
    Last,
}

impl From<DayOfMonthRepr> for DayOfMonth {
    fn from(repr: DayOfMonthRepr) -> Self {
        match repr {
            DayOfMonthRepr::Number(day) => Self::Day(day),
            DayOfMonthRepr::Named(NamedDay::First) => Self::First,
            DayOfMonthRepr::Named(NamedDay::Last) => Self::Last,
        }
    }
}

impl From<DayOfMonth> for DayOfMonthRepr {
    fn from(day: DayOfMonth) -> Self {
        match day {
            DayOfMonth::Day(day) => Self::Number(day),
            DayOfMonth::First => Self::Named(NamedDay::First),
            DayOfMonth::Last => Self::Named(NamedDay::Last),
        }
    }
}

/// What to do in months that lack the configured day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyFallback {
    /// Fire on the month's final day instead.
    LastDay,
    /// Do not fire that month.
    Skip,
}

/// Parses a 24-hour `HH:MM` time of day.
///
/// # Errors
///
/// Returns [`SpecError::InvalidTime`] unless the input is exactly two digits,
/// a colon and two digits with hour < 24 and minute < 60.
pub fn parse_time(value: &str) -> Result<NaiveTime, SpecError> {
    let invalid = || SpecError::InvalidTime {
        value: value.to_string(),
    };
    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hour) || !two_digits(minute) {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Converts a 1 (Monday) ..= 7 (Sunday) weekday number.
///
/// # Errors
///
/// Returns [`SpecError::InvalidWeekday`] for anything outside 1..=7.
pub fn weekday_from_number(day: u8) -> Result<Weekday, SpecError> {
    match day {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        value => Err(SpecError::InvalidWeekday { value }),
    }
}

/// Returns the distinct weekdays of a `days_of_week` list in Monday-first
/// order, or `None` when the list selects every day (empty or all seven).
///
/// # Errors
///
/// Returns the first out-of-range entry.
pub fn weekday_filter(days_of_week: &[u8]) -> Result<Option<Vec<Weekday>>, SpecError> {
    let mut selected = [false; 7];
    for &day in days_of_week {
        let weekday = weekday_from_number(day)?;
        selected[weekday.num_days_from_monday() as usize] = true;
    }
    if days_of_week.is_empty() || selected.iter().all(|&on| on) {
        return Ok(None);
    }
    let days = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .filter(|day| selected[day.num_days_from_monday() as usize])
    .collect();
    Ok(Some(days))
}
