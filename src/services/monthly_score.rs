use std::collections::HashSet;

use crate::models::performance::{MonthlyScoreRecord, WeeklyScoreRecord, MONTH_NAMES};
use crate::models::task::TaskRecord;
use crate::services::calendar_utils::{in_month, local_date, mean, ratio, round2};
use crate::services::week_partition::month_week_windows;
use crate::services::weekly_score::{calculate_weekly_score, ScoringContext};

const MO_COMPLETION_SHARE: f64 = 80.0;
const MO_CATEGORY_POINTS: f64 = 5.0;
const MO_DIVERSITY_CAP: f64 = 20.0;
const MO_MAX: f64 = 100.0;

const STAFF_WEIGHT: f64 = 0.8;
const OBJECTIVE_WEIGHT: f64 = 0.2;

/// Scores one month of `tasks`. Weeks in which no task was created are left out of
/// `weekly_data`, so `staff` averages only weeks that produced data.
pub fn calculate_monthly_score(
    tasks: &[TaskRecord],
    year: i32,
    month_index: u32,
    ctx: &ScoringContext,
) -> MonthlyScoreRecord {
    let month_tasks: Vec<TaskRecord> = tasks
        .iter()
        .filter(|task| in_month(local_date(task.created_at, ctx.timezone), year, month_index))
        .cloned()
        .collect();

    let weekly_data: Vec<WeeklyScoreRecord> = month_week_windows(year, month_index)
        .iter()
        .map(|window| calculate_weekly_score(&month_tasks, window, ctx))
        .filter(|record| !record.tasks.is_empty())
        .collect();

    let percentages: Vec<f64> = weekly_data.iter().map(|week| week.percentage).collect();
    let staff = mean(&percentages);
    let monthly_objective = monthly_objective_score(&month_tasks);
    let structural = staff * STAFF_WEIGHT + monthly_objective * OBJECTIVE_WEIGHT;
    let average = (staff + structural) / 2.0;

    MonthlyScoreRecord {
        year,
        month_index,
        month: MONTH_NAMES
            .get(month_index as usize)
            .copied()
            .unwrap_or_default()
            .to_string(),
        staff: round2(staff),
        structural: round2(structural),
        average: round2(average),
        monthly_objective: round2(monthly_objective),
        task_count: month_tasks.len(),
        weekly_data,
    }
}

/// All twelve months of `year`, January first.
pub fn calculate_year(tasks: &[TaskRecord], year: i32, ctx: &ScoringContext) -> Vec<MonthlyScoreRecord> {
    (0..12)
        .map(|month_index| calculate_monthly_score(tasks, year, month_index, ctx))
        .collect()
}

pub fn monthly_objective_score(tasks: &[TaskRecord]) -> f64 {
    let completed = tasks.iter().filter(|task| task.completed).count();
    let completion = ratio(completed, tasks.len()) * MO_COMPLETION_SHARE;
    (completion + diversity_bonus(tasks)).min(MO_MAX)
}

pub fn diversity_bonus(tasks: &[TaskRecord]) -> f64 {
    let categories: HashSet<&str> = tasks.iter().map(|task| task.category.as_str()).collect();
    (categories.len() as f64 * MO_CATEGORY_POINTS).min(MO_DIVERSITY_CAP)
}
