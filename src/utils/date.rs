//! Date and time helpers shared by the CLI and the HTTP layer.
//!
//! Storage uses ISO dates (`YYYY-MM-DD`); the attendance UI speaks
//! `DD-MM-YYYY`. Conversions between the two live here.

use crate::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, NaiveTime};

/// Date format used by the attendance UI.
pub const DISPLAY_DATE_FMT: &str = "%d-%m-%Y";

pub fn format_display_date(d: NaiveDate) -> String {
    d.format(DISPLAY_DATE_FMT).to_string()
}

/// Strict `DD-MM-YYYY`.
pub fn parse_display_date(s: &str) -> AppResult<NaiveDate> {
    let s = s.trim();
    // chrono accepts "1-2-2024"; the UI always sends zero-padded fields
    if s.len() != 10 {
        return Err(AppError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DISPLAY_DATE_FMT).map_err(|_| AppError::InvalidDate(s.to_string()))
}

/// `HH:MM:SS` or `HH:MM`.
pub fn parse_clock(s: &str) -> AppResult<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| AppError::InvalidTime(s.to_string()))
}

/// Parse a `--range` / `--date` value into an inclusive date interval.
///
/// Supporta:
/// - YYYY
/// - YYYY-MM
/// - YYYY-MM-DD
/// - any of the above as `start:end` (both sides in the same form)
pub fn parse_range(r: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::InvalidDate(r.to_string());

    match r.split_once(':') {
        Some((start, end)) => {
            let (start, end) = (start.trim(), end.trim());
            if start.len() != end.len() {
                return Err(AppError::Validation(format!(
                    "range '{r}': start and end must have the same format"
                )));
            }
            let (d1, _) = period_bounds(start).ok_or_else(invalid)?;
            let (_, d2) = period_bounds(end).ok_or_else(invalid)?;
            if d1 > d2 {
                return Err(AppError::Validation(format!("range '{r}': start after end")));
            }
            Ok((d1, d2))
        }
        None => period_bounds(r.trim()).ok_or_else(invalid),
    }
}

fn period_bounds(p: &str) -> Option<(NaiveDate, NaiveDate)> {
    match p.len() {
        // YYYY
        4 => {
            let y: i32 = p.parse().ok()?;
            Some((
                NaiveDate::from_ymd_opt(y, 1, 1)?,
                NaiveDate::from_ymd_opt(y, 12, 31)?,
            ))
        }
        // YYYY-MM
        7 => {
            let first = NaiveDate::parse_from_str(&format!("{p}-01"), "%Y-%m-%d").ok()?;
            Some((first, month_last_day(first)?))
        }
        // YYYY-MM-DD
        10 => {
            let d = NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()?;
            Some((d, d))
        }
        _ => None,
    }
}

fn month_last_day(first: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}
