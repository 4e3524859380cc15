//! Schedule grammar: a sentinel-prefixed interval or a cron expression.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use croner::Cron;

use crate::duration::parse_duration;
use crate::error::ScheduleError;

/// Marks a schedule as a fixed interval rather than a cron expression.
pub const DURATION_SENTINEL: char = '@';

/// When a probe fires.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Fixed interval, measured from registration.
    Every(Duration),
    /// Wall-clock instants matching a cron expression.
    Cron(CronSchedule),
}

impl Schedule {
    /// Parse a schedule string.
    ///
    /// Strings starting with [`DURATION_SENTINEL`] are intervals (`@10m`);
    /// anything else must be a 5-field or 6-field cron expression.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ScheduleError::Empty);
        }

        if let Some(interval) = s.strip_prefix(DURATION_SENTINEL) {
            let interval = parse_duration(interval).map_err(|source| ScheduleError::Duration {
                schedule: input.to_string(),
                source,
            })?;
            if interval.is_zero() {
                return Err(ScheduleError::ZeroInterval(input.to_string()));
            }
            return Ok(Schedule::Every(interval));
        }

        CronSchedule::parse(s).map(Schedule::Cron)
    }

    /// The fixed interval, if this is an interval schedule.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Schedule::Every(interval) => Some(*interval),
            Schedule::Cron(_) => None,
        }
    }

    /// Next firing strictly after `after`.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Schedule::Every(interval) => chrono::Duration::from_std(*interval)
                .ok()
                .and_then(|step| after.clone().checked_add_signed(step)),
            Schedule::Cron(cron) => cron.next_after(after),
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schedule::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Every(interval) => write!(f, "{DURATION_SENTINEL}{interval:?}"),
            Schedule::Cron(cron) => f.write_str(cron.expression()),
        }
    }
}

/// A parsed cron expression.
#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    cron: Arc<Cron>,
}

impl CronSchedule {
    fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let fields = expression.split_whitespace().count();
        if !(5..=6).contains(&fields) {
            return Err(ScheduleError::CronFields {
                expression: expression.to_string(),
                fields,
            });
        }

        let cron = Cron::new(expression)
            .with_seconds_optional()
            .parse()
            .map_err(|e| ScheduleError::Cron {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            cron: Arc::new(cron),
        })
    }

    /// The expression as written in the configuration.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next matching instant strictly after `after`, in `after`'s time zone.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}
