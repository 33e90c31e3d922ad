//! The schedule gate: a pure predicate deciding whether an invocation is due
//! at all, before any state is read.
//!
//! "Not due" is an expected outcome on most invocations (the jobs are fired
//! by cron far more often than they act), so the errors here are descriptive
//! messages, not faults.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

/// The days an invocation is allowed to act on, either by day of month or by
/// weekday, depending on the job variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunDays {
    DaysOfMonth(Vec<u32>),
    DaysOfWeek(Vec<Weekday>),
}

/// Earliest time of day to act, evaluated in the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAfter {
    pub time: NaiveTime,
    pub zone: Tz,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub run_days: RunDays,
    pub run_after: Option<RunAfter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotDue {
    #[error("No need to run - day of month is {day}, only running on day {} of each month", join_days(.days))]
    WrongDayOfMonth { day: u32, days: Vec<u32> },
    #[error("No need to run - today is {}, only running on {}", day_name(.day), join_weekdays(.days))]
    WrongDayOfWeek { day: Weekday, days: Vec<Weekday> },
    #[error("No need to run - time is {} in {zone}, only running after {} in {zone}", .time.format("%H:%M"), .run_after.format("%H:%M"))]
    TooEarly {
        time: NaiveTime,
        run_after: NaiveTime,
        zone: Tz,
    },
}

impl Schedule {
    /// Whether this invocation should proceed. The day check short-circuits
    /// before the time check. A `now` exactly equal to the run-after time is
    /// due; one minute earlier is not.
    pub fn should_run(&self, now: DateTime<Utc>) -> Result<(), NotDue> {
        let zone = self.run_after.map(|after| after.zone).unwrap_or(chrono_tz::UTC);
        let local = now.with_timezone(&zone);

        match &self.run_days {
            RunDays::DaysOfMonth(days) => {
                if !days.contains(&local.day()) {
                    return Err(NotDue::WrongDayOfMonth {
                        day: local.day(),
                        days: days.clone(),
                    });
                }
            }
            RunDays::DaysOfWeek(days) => {
                if !days.contains(&local.weekday()) {
                    return Err(NotDue::WrongDayOfWeek {
                        day: local.weekday(),
                        days: days.clone(),
                    });
                }
            }
        }

        if let Some(after) = self.run_after {
            if local.time() < after.time {
                return Err(NotDue::TooEarly {
                    time: local.time(),
                    run_after: after.time,
                    zone: after.zone,
                });
            }
        }

        Ok(())
    }
}

fn join_days(days: &[u32]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn day_name(day: &Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn join_weekdays(days: &[Weekday]) -> String {
    days.iter().map(day_name).collect::<Vec<_>>().join(", ")
}
