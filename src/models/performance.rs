use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::TaskRecord;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    #[default]
    C,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

/// Display severity used by distribution charts. Thresholds differ from [`Grade`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Excellent => "excellent",
            SeverityTier::Good => "good",
            SeverityTier::Fair => "fair",
            SeverityTier::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
    Completed,
    Late,
    NotSent,
}

impl WeekStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekStatus::Completed => "completed",
            WeekStatus::Late => "late",
            WeekStatus::NotSent => "not_sent",
        }
    }
}

/// Seven calendar days starting on a Sunday, numbered within the month it is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekWindow {
    pub week: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyScoreRecord {
    pub week: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: WeekStatus,
    pub dp: u32,
    pub rh: u32,
    pub wo: u32,
    pub total: f64,
    pub percentage: f64,
    pub tier: SeverityTier,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyScoreRecord {
    pub year: i32,
    pub month_index: u32,
    pub month: String,
    pub staff: f64,
    pub structural: f64,
    pub average: f64,
    pub monthly_objective: f64,
    pub task_count: usize,
    pub weekly_data: Vec<WeeklyScoreRecord>,
}

impl MonthlyScoreRecord {
    pub fn has_data(&self) -> bool {
        !self.weekly_data.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub overall_score: f64,
    pub weekly_average: f64,
    pub monthly_target: f64,
    pub achievement: Grade,
}

/// Table/chart view: the weeks of one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthWeeks {
    pub month: String,
    pub weeks: Vec<WeeklyScoreRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TierDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub owner_id: String,
    pub year: i32,
    pub as_of: DateTime<Utc>,
    pub timezone: String,
    pub months: Vec<MonthlyScoreRecord>,
    pub weekly_data: Vec<MonthWeeks>,
    pub overall: OverallStats,
    pub distribution: TierDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceQuery {
    pub year: i32,
    /// 1-12; filters the returned months after the full year was computed.
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// RFC 3339 evaluation timestamp; defaults to now.
    #[serde(default)]
    pub as_of: Option<String>,
}

impl PerformanceQuery {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            month: None,
            owner_id: None,
            as_of: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportExportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ReportExportFormat::Markdown => "md",
            ReportExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExportParams {
    #[serde(flatten)]
    pub query: PerformanceQuery,
    #[serde(default)]
    pub format: ReportExportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExportResult {
    pub file_path: String,
    pub format: ReportExportFormat,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshotRecord {
    pub id: String,
    pub owner_id: String,
    pub year: i32,
    pub as_of: String,
    pub overall_score: f64,
    pub achievement: Grade,
    pub report: PerformanceReport,
    pub created_at: String,
}
