use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid RFC 3339 timestamp",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}

pub fn parse_optional_datetime(value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Ok(Some(parse_datetime(raw)?)),
        None => Ok(None),
    }
}

pub fn parse_timezone(value: &str) -> AppResult<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| AppError::validation(format!("unknown timezone `{value}`")))
}

/// Calendar date of an instant as seen in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn first_day_of_month(year: i32, month_index: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month_index + 1, 1)
}

pub fn last_day_of_month(year: i32, month_index: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month_index >= 11 {
        (year + 1, 1)
    } else {
        (year, month_index + 2)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|date| date.pred_opt())
}

pub fn in_month(date: NaiveDate, year: i32, month_index: u32) -> bool {
    date.year() == year && date.month0() == month_index
}

/// `part / whole`, or 0 when there is nothing to divide by.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
