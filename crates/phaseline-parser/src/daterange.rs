//! Localized date-range parsing.
//!
//! Source spreadsheets store phase windows as `"DD/MM/YYYY → DD/MM/YYYY"`.
//! Parsing never fails loudly: anything that does not decompose into two
//! day/month/year tokens yields `None` and the caller skips the phase.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Delimiter between the start and end tokens
pub const RANGE_DELIMITER: char = '→';

/// How out-of-range day/month components are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloverPolicy {
    /// Carry overflow into the next unit: 31/04 is 01/05, month 13 is
    /// January of the following year, day 0 is the last day of the
    /// previous month.
    #[default]
    Lenient,
    /// Reject dates that do not exist on the calendar
    Strict,
}

/// A parsed start/end pair. `start <= end` is not enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// End before start; a display anomaly, not a parse failure
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }
}

/// Parse `"DD/MM/YYYY → DD/MM/YYYY"` with lenient rollover
pub fn parse_date_range(input: &str) -> Option<DateRange> {
    parse_date_range_with(input, RolloverPolicy::Lenient)
}

/// Parse a date range under an explicit rollover policy
pub fn parse_date_range_with(input: &str, policy: RolloverPolicy) -> Option<DateRange> {
    if input.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = input.split(RANGE_DELIMITER).map(str::trim).collect();
    let [start, end] = tokens.as_slice() else {
        return None;
    };

    Some(DateRange {
        start: parse_day_month_year(start, policy)?,
        end: parse_day_month_year(end, policy)?,
    })
}

/// Parse a single `DD/MM/YYYY` token
pub fn parse_day_month_year(token: &str, policy: RolloverPolicy) -> Option<NaiveDate> {
    let mut parts = token.split('/');
    let day = component(parts.next())?;
    let month = component(parts.next())?;
    let year = component(parts.next())?;

    match policy {
        RolloverPolicy::Lenient => roll_over(year, month, day),
        RolloverPolicy::Strict => NaiveDate::from_ymd_opt(
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        ),
    }
}

fn component(part: Option<&str>) -> Option<i64> {
    let part = part?.trim();
    if part.is_empty() {
        return None;
    }
    part.parse().ok()
}

/// Calendar construction that carries overflow, like a zero-based month
/// date constructor: month is converted to 0-indexed, then day offsets
/// are added to the first of that month.
fn roll_over(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month0 = months.rem_euclid(12) as u32;

    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
    first.checked_add_signed(Duration::try_days(day.checked_sub(1)?)?)
}
