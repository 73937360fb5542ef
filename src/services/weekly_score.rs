use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::performance::{WeekStatus, WeekWindow, WeeklyScoreRecord};
use crate::models::task::{TaskPriority, TaskRecord};
use crate::services::calendar_utils::{clamp_percentage, local_date, ratio, round2};
use crate::services::grade::tier_of;

pub const DP_MAX: f64 = 40.0;
pub const RH_MAX: f64 = 20.0;
pub const WO_MAX: f64 = 40.0;
const WO_COMPLETION_SHARE: f64 = 30.0;
const WO_HIGH_PRIORITY_SHARE: f64 = 10.0;

const DP_WEIGHT: f64 = 0.4;
const RH_WEIGHT: f64 = 0.2;
const WO_WEIGHT: f64 = 0.4;

/// Inputs every score depends on besides the tasks themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    /// Instant against which deadlines are judged.
    pub as_of: DateTime<Utc>,
    /// Zone used to place `created_at` on the calendar.
    pub timezone: Tz,
}

impl ScoringContext {
    pub fn new(as_of: DateTime<Utc>, timezone: Tz) -> Self {
        Self { as_of, timezone }
    }

    pub fn utc(as_of: DateTime<Utc>) -> Self {
        Self::new(as_of, Tz::UTC)
    }
}

pub fn calculate_weekly_score(
    tasks: &[TaskRecord],
    window: &WeekWindow,
    ctx: &ScoringContext,
) -> WeeklyScoreRecord {
    let week_tasks: Vec<TaskRecord> = tasks
        .iter()
        .filter(|task| window.contains(local_date(task.created_at, ctx.timezone)))
        .cloned()
        .collect();

    let dp = daily_planning_score(&week_tasks);
    let rh = report_score(&week_tasks);
    let wo = weekly_objective_score(&week_tasks);
    let total = weighted_total(dp, rh, wo);
    let percentage = round2(clamp_percentage(total));

    WeeklyScoreRecord {
        week: window.week,
        week_start: window.start,
        week_end: window.end,
        status: week_status(&week_tasks, ctx.as_of),
        dp,
        rh,
        wo,
        total,
        percentage,
        tier: tier_of(percentage),
        tasks: week_tasks,
    }
}

/// `dp×0.4 + rh×0.2 + wo×0.4`, applied to sub-scores already scaled to their maxima.
pub fn weighted_total(dp: u32, rh: u32, wo: u32) -> f64 {
    round2(dp as f64 * DP_WEIGHT + rh as f64 * RH_WEIGHT + wo as f64 * WO_WEIGHT)
}

pub fn daily_planning_score(tasks: &[TaskRecord]) -> u32 {
    let planned = tasks.iter().filter(|task| task.is_planned()).count();
    (ratio(planned, tasks.len()) * DP_MAX).round() as u32
}

pub fn report_score(tasks: &[TaskRecord]) -> u32 {
    let reported = tasks.iter().filter(|task| task.is_reported()).count();
    (ratio(reported, tasks.len()) * RH_MAX).round() as u32
}

pub fn weekly_objective_score(tasks: &[TaskRecord]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }

    let completed = tasks.iter().filter(|task| task.completed).count();
    let mut score = ratio(completed, tasks.len()) * WO_COMPLETION_SHARE;

    let high: Vec<&TaskRecord> = tasks
        .iter()
        .filter(|task| task.priority == TaskPriority::High)
        .collect();
    if !high.is_empty() {
        let high_completed = high.iter().filter(|task| task.completed).count();
        score += ratio(high_completed, high.len()) * WO_HIGH_PRIORITY_SHARE;
    }

    score.min(WO_MAX).round() as u32
}

/// Status as of `as_of`; re-evaluating later can turn a completed week late.
pub fn week_status(tasks: &[TaskRecord], as_of: DateTime<Utc>) -> WeekStatus {
    if tasks.is_empty() {
        WeekStatus::NotSent
    } else if tasks.iter().any(|task| task.is_overdue(as_of)) {
        WeekStatus::Late
    } else {
        WeekStatus::Completed
    }
}
