use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::db::repositories::snapshot_repository::{PerformanceSnapshotRow, SnapshotRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::performance::{
    MonthWeeks, OverallStats, PerformanceQuery, PerformanceReport, PerformanceSnapshotRecord,
    ReportExportFormat, ReportExportParams, ReportExportResult,
};
use crate::models::task::TaskRecord;
use crate::models::user::CurrentUser;
use crate::services::calendar_utils::{parse_optional_datetime, parse_timezone};
use crate::services::monthly_score::calculate_year;
use crate::services::overall_stats::{summarize_year, tier_distribution, weekly_view};
use crate::services::report_cache::{
    AsOfKey, ReportCache, ReportCacheKey, DEFAULT_REPORT_TTL_SECONDS,
};
use crate::services::settings_service::SettingsService;
use crate::services::task_service::{resolve_owner, TaskService};
use crate::services::weekly_score::ScoringContext;

const REPORT_PREFIX: &str = "performance-report";
const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 20;
pub const MAX_SNAPSHOT_LIMIT: usize = 200;

#[derive(Debug, Clone)]
struct ResolvedQuery {
    owner_id: String,
    year: i32,
    month: Option<u32>,
    as_of: DateTime<Utc>,
    /// False when `as_of` fell back to the clock.
    as_of_explicit: bool,
}

pub struct PerformanceService {
    db: DbPool,
    tasks: Arc<TaskService>,
    settings: Arc<SettingsService>,
    cache: ReportCache,
    reports_dir: PathBuf,
}

impl PerformanceService {
    pub fn new(
        db: DbPool,
        tasks: Arc<TaskService>,
        settings: Arc<SettingsService>,
    ) -> AppResult<Self> {
        let reports_dir = default_reports_dir(db.path());
        std::fs::create_dir_all(&reports_dir)?;
        Ok(Self {
            db,
            tasks,
            settings,
            cache: ReportCache::new(Duration::seconds(DEFAULT_REPORT_TTL_SECONDS)),
            reports_dir,
        })
    }

    pub fn fetch_report(
        &self,
        user: &CurrentUser,
        query: PerformanceQuery,
    ) -> AppResult<PerformanceReport> {
        let resolved = resolve_query(user, &query)?;
        let report = self.year_report(&resolved)?;
        Ok(apply_month_filter(report, resolved.month))
    }

    pub fn fetch_weekly(
        &self,
        user: &CurrentUser,
        query: PerformanceQuery,
    ) -> AppResult<Vec<MonthWeeks>> {
        Ok(self.fetch_report(user, query)?.weekly_data)
    }

    /// Year summary; the month filter never narrows it.
    pub fn fetch_overall(
        &self,
        user: &CurrentUser,
        query: PerformanceQuery,
    ) -> AppResult<OverallStats> {
        Ok(self.fetch_report(user, query)?.overall)
    }

    pub fn export_report(
        &self,
        user: &CurrentUser,
        params: ReportExportParams,
    ) -> AppResult<ReportExportResult> {
        let report = self.fetch_report(user, params.query)?;
        self.generate_report_file(&report, params.format)
    }

    pub fn capture_snapshot(
        &self,
        user: &CurrentUser,
        query: PerformanceQuery,
    ) -> AppResult<PerformanceSnapshotRecord> {
        let report = self.fetch_report(user, query)?;
        let record = PerformanceSnapshotRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: report.owner_id.clone(),
            year: report.year,
            as_of: report.as_of.to_rfc3339_opts(SecondsFormat::Millis, true),
            overall_score: report.overall.overall_score,
            achievement: report.overall.achievement,
            report,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let row = PerformanceSnapshotRow::from_record(&record)?;
        self.db
            .with_connection(|conn| SnapshotRepository::insert(conn, &row))?;
        info!(
            target: "app::performance",
            snapshot_id = %record.id,
            owner_id = %record.owner_id,
            year = record.year,
            overall_score = record.overall_score,
            "performance snapshot captured"
        );
        Ok(record)
    }

    pub fn list_snapshots(
        &self,
        user: &CurrentUser,
        owner_id: Option<String>,
        limit: Option<usize>,
    ) -> AppResult<Vec<PerformanceSnapshotRecord>> {
        let owner = resolve_owner(user, owner_id.as_deref())?;
        let limit = limit.unwrap_or(DEFAULT_SNAPSHOT_LIMIT);
        if !(1..=MAX_SNAPSHOT_LIMIT).contains(&limit) {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {MAX_SNAPSHOT_LIMIT}"
            )));
        }

        let rows = self
            .db
            .with_connection(|conn| SnapshotRepository::list(conn, Some(&owner), limit))?;
        rows.into_iter().map(|row| row.into_record()).collect()
    }

    pub fn get_snapshot(&self, user: &CurrentUser, id: &str) -> AppResult<PerformanceSnapshotRecord> {
        let record = self
            .db
            .with_connection(|conn| SnapshotRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?
            .into_record()?;
        if !user.can_access(&record.owner_id) {
            return Err(AppError::forbidden(format!(
                "snapshot {id} belongs to another user"
            )));
        }
        Ok(record)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }

    fn year_report(&self, resolved: &ResolvedQuery) -> AppResult<PerformanceReport> {
        let settings = self.settings.get()?;
        let timezone = parse_timezone(&settings.timezone)?;
        let tasks = self.tasks.tasks_for_owner(&resolved.owner_id)?;

        let key = ReportCacheKey::new(
            &resolved.owner_id,
            resolved.year,
            &settings.timezone,
            &tasks,
            resolved.as_of_key(settings.status_granularity_minutes),
        )?;
        if let Some(report) = self.cache.get(&key) {
            return Ok(report);
        }

        self.cache.purge_expired();
        let ctx = ScoringContext::new(resolved.as_of, timezone);
        let report = build_report(&resolved.owner_id, resolved.year, &tasks, &ctx);
        debug!(
            target: "app::performance",
            owner_id = %resolved.owner_id,
            year = resolved.year,
            task_count = tasks.len(),
            overall_score = report.overall.overall_score,
            "performance report computed"
        );
        self.cache.insert(&key, report.clone());
        debug!(target: "app::performance::cache", cached = self.cache.len(), "report cached");
        Ok(report)
    }

    fn generate_report_file(
        &self,
        report: &PerformanceReport,
        format: ReportExportFormat,
    ) -> AppResult<ReportExportResult> {
        let now = Utc::now();
        let filename = format!(
            "{REPORT_PREFIX}-{}-{}-{}.{}",
            sanitize_file_component(&report.owner_id),
            report.year,
            now.format("%Y%m%dT%H%M%S%3fZ"),
            format.file_extension()
        );
        let path = self.reports_dir.join(filename);

        match format {
            ReportExportFormat::Markdown => {
                std::fs::write(&path, render_markdown_report(report))?;
            }
            ReportExportFormat::Json => {
                let json = serde_json::to_string_pretty(report)?;
                std::fs::write(&path, json)?;
            }
        }

        info!(
            target: "app::performance",
            path = %path.display(),
            format = format.file_extension(),
            "performance report exported"
        );

        Ok(ReportExportResult {
            file_path: path.to_string_lossy().to_string(),
            format,
            generated_at: now.to_rfc3339(),
        })
    }
}

/// Full-year report of `tasks` evaluated under `ctx`.
pub fn build_report(
    owner_id: &str,
    year: i32,
    tasks: &[TaskRecord],
    ctx: &ScoringContext,
) -> PerformanceReport {
    let months = calculate_year(tasks, year, ctx);
    PerformanceReport {
        owner_id: owner_id.to_string(),
        year,
        as_of: ctx.as_of,
        timezone: ctx.timezone.name().to_string(),
        overall: summarize_year(&months),
        weekly_data: weekly_view(&months),
        distribution: tier_distribution(&months),
        months,
    }
}

/// Narrows a full-year report to one month (1-12). `overall` keeps the year summary.
pub fn apply_month_filter(mut report: PerformanceReport, month: Option<u32>) -> PerformanceReport {
    if let Some(month) = month {
        report.months.retain(|record| record.month_index + 1 == month);
        report.weekly_data = weekly_view(&report.months);
        report.distribution = tier_distribution(&report.months);
    }
    report
}

impl ResolvedQuery {
    fn as_of_key(&self, granularity_minutes: u32) -> AsOfKey {
        if self.as_of_explicit {
            AsOfKey::Exact(self.as_of)
        } else {
            AsOfKey::Bucketed {
                at: self.as_of,
                granularity_minutes,
            }
        }
    }
}

fn resolve_query(user: &CurrentUser, query: &PerformanceQuery) -> AppResult<ResolvedQuery> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&query.year) {
        return Err(AppError::validation(format!(
            "year must have four digits (got {})",
            query.year
        )));
    }
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(AppError::validation(format!(
                "month must be between 1 and 12 (got {month})"
            )));
        }
    }

    let owner_id = resolve_owner(user, query.owner_id.as_deref())?;
    let requested = parse_optional_datetime(query.as_of.as_deref())?;
    let as_of_explicit = requested.is_some();
    let as_of = requested.unwrap_or_else(Utc::now);

    Ok(ResolvedQuery {
        owner_id,
        year: query.year,
        month: query.month,
        as_of,
        as_of_explicit,
    })
}

fn default_reports_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map(|dir| dir.join("reports"))
        .unwrap_or_else(|| std::env::temp_dir().join("toachieve"))
}

fn sanitize_file_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "owner".to_string()
    } else {
        cleaned
    }
}

fn render_markdown_report(report: &PerformanceReport) -> String {
    let overall = &report.overall;
    let mut content = String::new();
    content.push_str("# To-Achieve List Performance Report\n\n");
    content.push_str(&format!("- Owner: {}\n", report.owner_id));
    content.push_str(&format!("- Year: {}\n", report.year));
    content.push_str(&format!("- Evaluated at: {}\n", report.as_of.to_rfc3339()));
    content.push_str(&format!("- Timezone: {}\n\n", report.timezone));

    content.push_str("## Overall\n");
    content.push_str(&format!(
        "- Overall score: {:.2}\n- Weekly average: {:.2}\n- Monthly target: {:.2}\n- Achievement: {}\n\n",
        overall.overall_score,
        overall.weekly_average,
        overall.monthly_target,
        overall.achievement.as_str()
    ));

    content.push_str("## Months\n");
    content.push_str("| Month | Staff | Structural | Average | MO | Tasks |\n");
    content.push_str("|---|---:|---:|---:|---:|---:|\n");
    for month in &report.months {
        content.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {} |\n",
            month.month,
            month.staff,
            month.structural,
            month.average,
            month.monthly_objective,
            month.task_count
        ));
    }
    content.push('\n');

    content.push_str("## Weeks\n");
    for entry in report.weekly_data.iter().filter(|entry| !entry.weeks.is_empty()) {
        content.push_str(&format!("### {}\n", entry.month));
        content.push_str("| Week | Dates | Status | DP | RH | WO | Total | % |\n");
        content.push_str("|---:|---|---|---:|---:|---:|---:|---:|\n");
        for week in &entry.weeks {
            content.push_str(&format!(
                "| {} | {}..{} | {} | {} | {} | {} | {:.2} | {:.2} |\n",
                week.week,
                week.week_start,
                week.week_end,
                week.status.as_str(),
                week.dp,
                week.rh,
                week.wo,
                week.total,
                week.percentage
            ));
        }
        content.push('\n');
    }

    let distribution = &report.distribution;
    content.push_str("## Distribution\n");
    content.push_str(&format!(
        "- Excellent: {}\n- Good: {}\n- Fair: {}\n- Poor: {}\n",
        distribution.excellent, distribution.good, distribution.fair, distribution.poor
    ));

    content
}
