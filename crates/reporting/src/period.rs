//! Date ranges, dashboard date modes, and the previous-period rule used
//! for period-over-period deltas.

use adboard_core::{AdboardError, AdboardResult};
use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AdboardResult<Self> {
        if end < start {
            return Err(AdboardError::InvalidArgument(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The same window one calendar month earlier. Each endpoint is
    /// shifted independently and clamped to the target month's length, so
    /// Mar 31 maps to the last day of February.
    pub fn previous_month(&self) -> Self {
        Self {
            start: one_month_back(self.start),
            end: one_month_back(self.end),
        }
    }
}

fn one_month_back(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(1))
        .unwrap_or(NaiveDate::MIN)
}

/// Date selector offered by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateMode {
    #[default]
    All,
    Custom,
    #[serde(rename = "last-7")]
    Last7,
    #[serde(rename = "last-30")]
    Last30,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
}

impl FromStr for DateMode {
    type Err = AdboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "custom" => Ok(Self::Custom),
            "last-7" => Ok(Self::Last7),
            "last-30" => Ok(Self::Last30),
            "this-week" => Ok(Self::ThisWeek),
            "last-week" => Ok(Self::LastWeek),
            "this-month" => Ok(Self::ThisMonth),
            "last-month" => Ok(Self::LastMonth),
            other => Err(AdboardError::InvalidArgument(format!(
                "date mode must be one of: all, custom, last-7, last-30, this-week, \
                 last-week, this-month, last-month (got {other:?})"
            ))),
        }
    }
}

/// Resolve a date mode to a concrete range relative to `today`.
///
/// `All` and a `Custom` mode missing either boundary resolve to `None`:
/// no range filter and no comparison period.
pub fn resolve_range(
    mode: DateMode,
    today: NaiveDate,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    week_start: Weekday,
) -> AdboardResult<Option<DateRange>> {
    let range = match mode {
        DateMode::All => return Ok(None),
        DateMode::Custom => match (custom_start, custom_end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            _ => return Ok(None),
        },
        DateMode::Last7 => DateRange {
            start: today - Duration::days(6),
            end: today,
        },
        DateMode::Last30 => DateRange {
            start: today - Duration::days(29),
            end: today,
        },
        DateMode::ThisWeek => DateRange {
            start: start_of_week(today, week_start),
            end: today,
        },
        DateMode::LastWeek => {
            let start = start_of_week(today, week_start) - Duration::days(7);
            DateRange {
                start,
                end: start + Duration::days(6),
            }
        }
        DateMode::ThisMonth => DateRange {
            start: first_of_month(today),
            end: today,
        },
        DateMode::LastMonth => {
            let end = first_of_month(today) - Duration::days(1);
            DateRange {
                start: first_of_month(end),
                end,
            }
        }
    };
    Ok(Some(range))
}

/// Current and previous windows for period-over-period deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPair {
    pub current: DateRange,
    pub previous: DateRange,
}

impl PeriodPair {
    pub fn from_current(current: DateRange) -> Self {
        Self {
            current,
            previous: current.previous_month(),
        }
    }
}

fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date - Duration::days(offset as i64)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
