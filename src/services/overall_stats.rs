use crate::models::performance::{
    MonthWeeks, MonthlyScoreRecord, OverallStats, SeverityTier, TierDistribution,
};
use crate::services::calendar_utils::{mean, round2};
use crate::services::grade::grade_of;

pub const MONTHLY_TARGET: f64 = 95.0;

/// Rolls a year of monthly records up into one summary. Months without weekly data
/// do not count towards either average.
pub fn summarize_year(months: &[MonthlyScoreRecord]) -> OverallStats {
    let valid: Vec<&MonthlyScoreRecord> = months.iter().filter(|month| month.has_data()).collect();
    if valid.is_empty() {
        return OverallStats {
            overall_score: 0.0,
            weekly_average: 0.0,
            monthly_target: MONTHLY_TARGET,
            achievement: Default::default(),
        };
    }

    let averages: Vec<f64> = valid.iter().map(|month| month.average).collect();
    let weekly: Vec<f64> = valid
        .iter()
        .flat_map(|month| month.weekly_data.iter().map(|week| week.percentage))
        .collect();

    let overall_score = round2(mean(&averages));
    OverallStats {
        overall_score,
        weekly_average: round2(mean(&weekly)),
        monthly_target: MONTHLY_TARGET,
        achievement: grade_of(overall_score),
    }
}

pub fn weekly_view(months: &[MonthlyScoreRecord]) -> Vec<MonthWeeks> {
    months
        .iter()
        .map(|month| MonthWeeks {
            month: month.month.clone(),
            weeks: month.weekly_data.clone(),
        })
        .collect()
}

pub fn tier_distribution(months: &[MonthlyScoreRecord]) -> TierDistribution {
    let mut distribution = TierDistribution::default();
    for week in months.iter().flat_map(|month| month.weekly_data.iter()) {
        match week.tier {
            SeverityTier::Excellent => distribution.excellent += 1,
            SeverityTier::Good => distribution.good += 1,
            SeverityTier::Fair => distribution.fair += 1,
            SeverityTier::Poor => distribution.poor += 1,
        }
    }
    distribution
}
