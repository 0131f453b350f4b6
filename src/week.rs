use chrono::{Datelike, NaiveDate, Weekday};

use crate::errors::ScoringError;

/// ISO-8601 week number (1..=53). Week 1 holds the year's first Thursday.
pub fn week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// The ISO week-numbering year, which differs from `date.year()` near New Year.
pub fn iso_year(date: NaiveDate) -> i32 {
    date.iso_week().year()
}

/// Inclusive Monday..=Sunday range of `week` in ISO year `year`.
pub fn week_date_range(week: u32, year: i32) -> Result<(NaiveDate, NaiveDate), ScoringError> {
    let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or(
        ScoringError::InvalidInput {
            field: "week",
            value: i64::from(week),
        },
    )?;
    let end = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun).ok_or(
        ScoringError::InvalidInput {
            field: "year",
            value: i64::from(year),
        },
    )?;
    Ok((start, end))
}
