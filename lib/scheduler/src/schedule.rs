//! Next-fire-time calculation for recurrence specs.
//!
//! All calendar arithmetic happens in the wall-clock time of the zone
//! `now` is expressed in. The reference instant is always passed in; this
//! module never reads a clock.

use crate::error::ScheduleError;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;
use varflow_core::Result;
use varflow_workflow::recurrence::{parse_time, weekday_filter, weekday_from_number};
use varflow_workflow::{DayOfMonth, MonthlyFallback, RecurrenceSpec, ScheduledRecurrence};

/// Tunables for schedule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// How many months past the current one a monthly schedule may look
    /// before giving up.
    #[serde(default = "default_max_month_lookahead")]
    pub max_month_lookahead: u32,
}

fn default_max_month_lookahead() -> u32 {
    12
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            max_month_lookahead: default_max_month_lookahead(),
        }
    }
}

/// Computes when a recurrence fires next.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleCalculator {
    options: ScheduleOptions,
}

impl ScheduleCalculator {
    /// Creates a calculator with the given options.
    #[must_use]
    pub const fn new(options: ScheduleOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    #[must_use]
    pub const fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Returns the first firing strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidSpec`] for specs that fail
    /// validation, [`ScheduleError::NoOccurrence`] when a monthly schedule
    /// has no matching day inside the lookahead window, and
    /// [`ScheduleError::OutOfRange`] at the edge of the calendar.
    pub fn next_fire_time<Tz: TimeZone>(
        &self,
        spec: &RecurrenceSpec,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, ScheduleError> {
        match spec {
            RecurrenceSpec::Interval { amount, unit } => {
                if *amount == 0 {
                    return Err(ScheduleError::invalid("interval amount must be positive").into());
                }
                Ok(now
                    .clone()
                    .checked_add_signed(unit.duration(*amount))
                    .ok_or(ScheduleError::OutOfRange)?)
            }
            RecurrenceSpec::Scheduled(ScheduledRecurrence::Hourly {
                hourly_interval,
                minute_of_hour,
            }) => next_hourly(now, *hourly_interval, *minute_of_hour),
            RecurrenceSpec::Scheduled(ScheduledRecurrence::Daily { time, days_of_week }) => {
                next_daily(now, time, days_of_week)
            }
            RecurrenceSpec::Scheduled(ScheduledRecurrence::Weekly { time, day_of_week }) => {
                next_weekly(now, time, *day_of_week)
            }
            RecurrenceSpec::Scheduled(ScheduledRecurrence::Monthly {
                time,
                day_of_month,
                monthly_fallback,
            }) => self.next_monthly(now, time, *day_of_month, *monthly_fallback),
        }
    }

    /// Returns the next `count` firings after `now`, in order.
    ///
    /// # Errors
    ///
    /// Fails as soon as any single step fails.
    pub fn upcoming<Tz: TimeZone>(
        &self,
        spec: &RecurrenceSpec,
        now: &DateTime<Tz>,
        count: usize,
    ) -> Result<Vec<DateTime<Tz>>, ScheduleError> {
        let mut runs = Vec::with_capacity(count);
        let mut cursor = now.clone();
        for _ in 0..count {
            cursor = self.next_fire_time(spec, &cursor)?;
            runs.push(cursor.clone());
        }
        Ok(runs)
    }

    fn next_monthly<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        time: &str,
        day_of_month: DayOfMonth,
        fallback: Option<MonthlyFallback>,
    ) -> Result<DateTime<Tz>, ScheduleError> {
        let time = parse_time(time).map_err(ScheduleError::from)?;
        day_of_month.check().map_err(ScheduleError::from)?;
        if day_of_month.needs_fallback() && fallback.is_none() {
            return Err(ScheduleError::invalid("monthly_fallback is required").into());
        }

        let tz = now.timezone();
        let local = now.naive_local();
        let (mut year, mut month) = (local.year(), local.month());
        for _ in 0..=self.options.max_month_lookahead {
            if let Some(day) = resolve_day(year, month, day_of_month, fallback)? {
                let date =
                    NaiveDate::from_ymd_opt(year, month, day).ok_or(ScheduleError::OutOfRange)?;
                if let Some(candidate) = localize(&tz, date.and_time(time)) {
                    if candidate > *now {
                        return Ok(candidate);
                    }
                }
            }
            (year, month) = next_month(year, month);
        }
        Err(ScheduleError::NoOccurrence {
            months_searched: self.options.max_month_lookahead,
        }
        .into())
    }
}

/// Returns the first firing of `spec` strictly after `now`, using default
/// options.
///
/// # Errors
///
/// See [`ScheduleCalculator::next_fire_time`].
pub fn next_fire_time<Tz: TimeZone>(
    spec: &RecurrenceSpec,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, ScheduleError> {
    ScheduleCalculator::default().next_fire_time(spec, now)
}

/// Maps a wall-clock time to an instant. Nonexistent local times (DST
/// gaps) yield `None`; ambiguous ones resolve to the earlier instant.
fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

/// Returns the first candidate after `now`, walking days forward from
/// today. `times` yields the wall-clock times to try on a given day.
fn first_after<Tz, F, I>(
    now: &DateTime<Tz>,
    days: u64,
    mut times: F,
) -> Result<DateTime<Tz>, ScheduleError>
where
    Tz: TimeZone,
    F: FnMut(NaiveDate) -> I,
    I: IntoIterator<Item = NaiveDateTime>,
{
    let tz = now.timezone();
    let today = now.naive_local().date();
    for date in today.iter_days().take(days as usize) {
        for naive in times(date) {
            if let Some(candidate) = localize(&tz, naive) {
                if candidate > *now {
                    return Ok(candidate);
                }
            }
        }
    }
    Err(ScheduleError::OutOfRange.into())
}

fn next_hourly<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hourly_interval: u32,
    minute_of_hour: u32,
) -> Result<DateTime<Tz>, ScheduleError> {
    if !(1..=24).contains(&hourly_interval) {
        return Err(ScheduleError::invalid(format!(
            "hourly interval {hourly_interval} is outside 1..=24"
        ))
        .into());
    }
    if minute_of_hour > 59 {
        return Err(ScheduleError::invalid(format!(
            "minute {minute_of_hour} is outside 0..=59"
        ))
        .into());
    }
    // Hour 0 always matches, so the following day is guaranteed to yield a
    // candidate; the third day only covers a DST gap at midnight.
    first_after(now, 3, |date| {
        (0..24)
            .step_by(hourly_interval as usize)
            .filter_map(move |hour| date.and_hms_opt(hour, minute_of_hour, 0))
    })
}

fn next_daily<Tz: TimeZone>(
    now: &DateTime<Tz>,
    time: &str,
    days_of_week: &[u8],
) -> Result<DateTime<Tz>, ScheduleError> {
    let time = parse_time(time).map_err(ScheduleError::from)?;
    let filter = weekday_filter(days_of_week).map_err(ScheduleError::from)?;
    first_after(now, 9, |date| {
        let allowed = filter
            .as_ref()
            .is_none_or(|days| days.contains(&date.weekday()));
        allowed.then(|| date.and_time(time))
    })
}

fn next_weekly<Tz: TimeZone>(
    now: &DateTime<Tz>,
    time: &str,
    day_of_week: u8,
) -> Result<DateTime<Tz>, ScheduleError> {
    let target = weekday_from_number(day_of_week).map_err(ScheduleError::from)?;
    let time = parse_time(time).map_err(ScheduleError::from)?;
    let today = now.naive_local().date();
    let offset = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let first = today
        .checked_add_days(Days::new(u64::from(offset)))
        .ok_or(ScheduleError::OutOfRange)?;
    // Offset 0 with the time already passed lands a week later.
    first_after_weeks(now, first, time)
}

fn first_after_weeks<Tz: TimeZone>(
    now: &DateTime<Tz>,
    first: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Tz>, ScheduleError> {
    let tz = now.timezone();
    for week in 0..3u64 {
        let date = first
            .checked_add_days(Days::new(week * 7))
            .ok_or(ScheduleError::OutOfRange)?;
        if let Some(candidate) = localize(&tz, date.and_time(time)) {
            if candidate > *now {
                return Ok(candidate);
            }
        }
    }
    Err(ScheduleError::OutOfRange.into())
}

/// Resolves the configured day for one month. `None` means the month is
/// skipped.
fn resolve_day(
    year: i32,
    month: u32,
    day_of_month: DayOfMonth,
    fallback: Option<MonthlyFallback>,
) -> Result<Option<u32>, ScheduleError> {
    let last = days_in_month(year, month).ok_or(ScheduleError::OutOfRange)?;
    let day = match day_of_month {
        DayOfMonth::First => Some(1),
        DayOfMonth::Last => Some(last),
        DayOfMonth::Day(day) if day <= last => Some(day),
        DayOfMonth::Day(day) => match fallback {
            Some(MonthlyFallback::LastDay) => {
                debug!(year, month, day, last, "clamping to last day of month");
                Some(last)
            }
            Some(MonthlyFallback::Skip) | None => {
                debug!(year, month, day, "month lacks configured day, skipping");
                None
            }
        },
    };
    Ok(day)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|date| date.day())
}
