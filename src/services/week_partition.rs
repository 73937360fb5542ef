use chrono::{Datelike, Duration};

use crate::models::performance::WeekWindow;
use crate::services::calendar_utils::{first_day_of_month, last_day_of_month};

/// Sunday-based weeks attributed to `(year, month_index)`, month index 0-11.
///
/// The first window starts on the Sunday on or before the 1st; windows overlapping the
/// month from either side belong to it and are numbered from 1.
pub fn month_week_windows(year: i32, month_index: u32) -> Vec<WeekWindow> {
    let (first, last) = match (
        first_day_of_month(year, month_index),
        last_day_of_month(year, month_index),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };

    let lead_days = first.weekday().num_days_from_sunday() as i64;
    let mut start = first - Duration::days(lead_days);
    let mut windows = Vec::new();
    let mut week = 1;

    while start <= last {
        let end = start + Duration::days(6);
        if end >= first {
            windows.push(WeekWindow { week, start, end });
            week += 1;
        }
        start = start + Duration::days(7);
    }

    windows
}
