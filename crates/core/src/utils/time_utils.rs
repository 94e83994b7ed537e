use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::constants::LONG_TERM_HOLDING_DAYS;
use crate::errors::{Result, ValidationError};

/// Normalizes an instant to its UTC calendar day.
///
/// This is the single source of truth for turning timestamps into domain
/// dates; the engine has no time-of-day semantics beyond ordering.
pub fn utc_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

pub fn today_utc() -> NaiveDate {
    utc_date(Utc::now())
}

/// Whole days from `start` to `end` (negative when `end` precedes `start`).
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Whether a lot bought on `purchase_date` and sold on `sale_date` is long-term.
pub fn is_long_term(purchase_date: NaiveDate, sale_date: NaiveDate) -> bool {
    days_between(purchase_date, sale_date) >= LONG_TERM_HOLDING_DAYS
}

/// Parses an ISO-8601 `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidInput(format!("Invalid date '{}': {}", value, e)).into()
    })
}

/// First and last calendar day of a year.
pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ValidationError::InvalidInput(format!("Invalid tax year {}", year)).into()),
    }
}

pub fn is_in_year(date: NaiveDate, year: i32) -> bool {
    date.year() == year
}

pub fn get_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        if let Some(next) = current.succ_opt() {
            current = next;
        } else {
            break;
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_utc_date_drops_time_of_day() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(utc_date(instant), d(2024, 3, 1));
    }

    #[test]
    fn test_long_term_boundary_is_365_days() {
        assert!(!is_long_term(d(2023, 1, 2), d(2024, 1, 1)));
        assert!(is_long_term(d(2023, 1, 2), d(2024, 1, 2)));
        assert_eq!(days_between(d(2024, 1, 1), d(2025, 1, 1)), 366);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2024-07-01").unwrap(), d(2024, 7, 1));
        assert!(parse_iso_date("07/01/2024").is_err());
    }

    #[test]
    fn test_get_days_between_is_inclusive() {
        let days = get_days_between(d(2024, 2, 27), d(2024, 3, 1));
        assert_eq!(days.len(), 4);
        assert!(get_days_between(d(2024, 3, 2), d(2024, 3, 1)).is_empty());
    }
}
