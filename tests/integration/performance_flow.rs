use std::fs;
use std::sync::Arc;

use toachieve_app_lib::db::DbPool;
use toachieve_app_lib::error::AppError;
use toachieve_app_lib::models::performance::{
    Grade, PerformanceQuery, PerformanceReport, ReportExportFormat, ReportExportParams,
    WeekStatus,
};
use toachieve_app_lib::models::task::TaskCreateInput;
use toachieve_app_lib::models::user::{CurrentUser, UserRole};
use toachieve_app_lib::services::performance_service::PerformanceService;
use toachieve_app_lib::services::settings_service::{SettingsService, SettingsUpdateInput};
use toachieve_app_lib::services::task_service::TaskService;
use tempfile::{tempdir, TempDir};

const AS_OF: &str = "2024-12-31T12:00:00Z";

struct Fixture {
    _dir: TempDir,
    tasks: Arc<TaskService>,
    settings: Arc<SettingsService>,
    performance: PerformanceService,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("performance.sqlite")).expect("db pool");
    let tasks = Arc::new(TaskService::new(pool.clone()));
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let performance =
        PerformanceService::new(pool, Arc::clone(&tasks), Arc::clone(&settings))
            .expect("performance service");
    Fixture {
        _dir: dir,
        tasks,
        settings,
        performance,
    }
}

fn alice() -> CurrentUser {
    CurrentUser::new("alice", UserRole::User)
}

fn query(year: i32) -> PerformanceQuery {
    PerformanceQuery {
        as_of: Some(AS_OF.into()),
        ..PerformanceQuery::for_year(year)
    }
}

/// One planned, reported task and one bare task in week 2 of May 2024.
fn seed_golden_week(tasks: &TaskService, user: &CurrentUser) {
    tasks
        .create_task(
            user,
            TaskCreateInput {
                title: "Prepare slides".into(),
                description: Some("quarterly review deck".into()),
                category: Some("Work".into()),
                priority: Some("medium".into()),
                completed: Some(true),
                completed_at: Some("2024-05-07T14:00:00Z".into()),
                estimated_time: Some(3.0),
                created_at: Some("2024-05-07T10:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create planned task");
    tasks
        .create_task(
            user,
            TaskCreateInput {
                title: "Call supplier".into(),
                category: Some("Work".into()),
                created_at: Some("2024-05-07T11:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create bare task");
}

#[test]
fn golden_week_flows_through_month_and_year() {
    let fx = fixture();
    let user = alice();
    seed_golden_week(&fx.tasks, &user);

    let report = fx
        .performance
        .fetch_report(&user, query(2024))
        .expect("fetch report");

    assert_eq!(report.owner_id, "alice");
    assert_eq!(report.timezone, "UTC");
    assert_eq!(report.months.len(), 12);
    assert_eq!(report.weekly_data.len(), 12);

    let may = &report.months[4];
    assert_eq!(may.month, "May");
    assert_eq!(may.task_count, 2);
    assert_eq!(may.weekly_data.len(), 1);

    let week = &may.weekly_data[0];
    assert_eq!(week.week, 2);
    assert_eq!((week.dp, week.rh, week.wo), (20, 10, 15));
    assert!((week.percentage - 16.0).abs() < 1e-9);
    assert_eq!(week.status, WeekStatus::Completed);

    assert!((may.staff - 16.0).abs() < 1e-9);
    assert!((may.monthly_objective - 45.0).abs() < 1e-9);
    assert!((may.structural - 21.8).abs() < 1e-9);
    assert!((may.average - 18.9).abs() < 1e-9);

    assert!((report.overall.overall_score - 18.9).abs() < 1e-9);
    assert!((report.overall.weekly_average - 16.0).abs() < 1e-9);
    assert_eq!(report.overall.monthly_target, 95.0);
    assert_eq!(report.overall.achievement, Grade::C);
    assert_eq!(report.distribution.poor, 1);
    assert_eq!(report.distribution.excellent, 0);

    for (index, month) in report.months.iter().enumerate() {
        if index != 4 {
            assert!(month.weekly_data.is_empty(), "{} should be empty", month.month);
            assert_eq!(month.average, 0.0);
        }
    }
}

#[test]
fn overdue_task_turns_week_late() {
    let fx = fixture();
    let user = alice();
    fx.tasks
        .create_task(
            &user,
            TaskCreateInput {
                title: "File taxes".into(),
                deadline: Some("2024-05-10T17:00:00Z".into()),
                created_at: Some("2024-05-06T09:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create task");

    let before_deadline = PerformanceQuery {
        as_of: Some("2024-05-09T00:00:00Z".into()),
        ..PerformanceQuery::for_year(2024)
    };
    let weeks = fx
        .performance
        .fetch_weekly(&user, before_deadline)
        .expect("weekly before deadline");
    assert_eq!(weeks[4].weeks[0].status, WeekStatus::Completed);

    let weeks = fx
        .performance
        .fetch_weekly(&user, query(2024))
        .expect("weekly after deadline");
    assert_eq!(weeks[4].weeks[0].status, WeekStatus::Late);
}

#[test]
fn month_filter_narrows_views_but_not_overall() {
    let fx = fixture();
    let user = alice();
    seed_golden_week(&fx.tasks, &user);
    fx.tasks
        .create_task(
            &user,
            TaskCreateInput {
                title: "Spring cleaning".into(),
                description: Some("garage".into()),
                estimated_time: Some(2.0),
                priority: Some("high".into()),
                completed: Some(true),
                created_at: Some("2024-03-12T08:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create march task");

    let full = fx
        .performance
        .fetch_report(&user, query(2024))
        .expect("full report");
    let filtered = fx
        .performance
        .fetch_report(
            &user,
            PerformanceQuery {
                month: Some(5),
                ..query(2024)
            },
        )
        .expect("filtered report");

    assert_eq!(filtered.months.len(), 1);
    assert_eq!(filtered.months[0].month, "May");
    assert_eq!(filtered.weekly_data.len(), 1);
    assert_eq!(filtered.distribution.poor + filtered.distribution.fair, 1);
    assert_eq!(filtered.overall, full.overall);

    let overall = fx
        .performance
        .fetch_overall(&user, query(2024))
        .expect("overall");
    assert_eq!(overall, full.overall);
    assert!(overall.overall_score > 18.9);
}

#[test]
fn reports_are_cached_until_tasks_change() {
    let fx = fixture();
    let user = alice();
    seed_golden_week(&fx.tasks, &user);

    let first = fx.performance.fetch_report(&user, query(2024)).expect("first");
    let second = fx.performance.fetch_report(&user, query(2024)).expect("second");
    assert_eq!(first, second);
    assert_eq!(fx.performance.cached_reports(), 1);

    fx.tasks
        .create_task(
            &user,
            TaskCreateInput {
                title: "Late addition".into(),
                created_at: Some("2024-05-08T09:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create task");

    let third = fx.performance.fetch_report(&user, query(2024)).expect("third");
    assert_eq!(fx.performance.cached_reports(), 2);
    assert_eq!(third.months[4].task_count, 3);
    assert!(third.months[4].staff < first.months[4].staff);
}

#[test]
fn other_owners_require_admin() {
    let fx = fixture();
    seed_golden_week(&fx.tasks, &alice());

    let bob = CurrentUser::new("bob", UserRole::User);
    let err = fx
        .performance
        .fetch_report(
            &bob,
            PerformanceQuery {
                owner_id: Some("alice".into()),
                ..query(2024)
            },
        )
        .expect_err("bob must not read alice");
    assert!(matches!(err, AppError::Forbidden { .. }));

    let own = fx.performance.fetch_report(&bob, query(2024)).expect("bob's own");
    assert_eq!(own.overall.overall_score, 0.0);

    let admin = CurrentUser::new("root", UserRole::Admin);
    let report = fx
        .performance
        .fetch_report(
            &admin,
            PerformanceQuery {
                owner_id: Some("alice".into()),
                ..query(2024)
            },
        )
        .expect("admin reads alice");
    assert_eq!(report.owner_id, "alice");
    assert!((report.overall.overall_score - 18.9).abs() < 1e-9);
}

#[test]
fn timezone_setting_moves_tasks_between_weeks() {
    let fx = fixture();
    let user = alice();
    // Saturday night in UTC, Sunday morning in Tokyo.
    fx.tasks
        .create_task(
            &user,
            TaskCreateInput {
                title: "Weekend review".into(),
                created_at: Some("2024-05-04T23:30:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create task");

    let utc = fx.performance.fetch_weekly(&user, query(2024)).expect("utc weeks");
    assert_eq!(utc[4].weeks.len(), 1);
    assert_eq!(utc[4].weeks[0].week, 1);

    fx.settings
        .update(SettingsUpdateInput {
            timezone: Some("Asia/Tokyo".into()),
            ..Default::default()
        })
        .expect("update timezone");

    let report = fx.performance.fetch_report(&user, query(2024)).expect("tokyo report");
    assert_eq!(report.timezone, "Asia/Tokyo");
    assert_eq!(report.months[4].weekly_data.len(), 1);
    assert_eq!(report.months[4].weekly_data[0].week, 2);
}

#[test]
fn export_writes_markdown_and_json_files() {
    let fx = fixture();
    let user = alice();
    seed_golden_week(&fx.tasks, &user);

    let markdown = fx
        .performance
        .export_report(
            &user,
            ReportExportParams {
                query: query(2024),
                format: ReportExportFormat::Markdown,
            },
        )
        .expect("markdown export");
    assert!(markdown.file_path.ends_with(".md"));
    let content = fs::read_to_string(&markdown.file_path).expect("read markdown");
    assert!(content.starts_with("# To-Achieve List Performance Report"));
    assert!(content.contains("| May |"));
    assert!(content.contains("### May"));
    assert!(content.contains("- Achievement: C"));

    let json = fx
        .performance
        .export_report(
            &user,
            ReportExportParams {
                query: query(2024),
                format: ReportExportFormat::Json,
            },
        )
        .expect("json export");
    assert!(json.file_path.ends_with(".json"));
    let raw = fs::read_to_string(&json.file_path).expect("read json");
    let parsed: PerformanceReport = serde_json::from_str(&raw).expect("parse exported report");
    assert_eq!(parsed.owner_id, "alice");
    assert!((parsed.overall.overall_score - 18.9).abs() < 1e-9);

    assert!(std::path::Path::new(&json.file_path).starts_with(fx.performance.reports_dir()));
}

#[test]
fn snapshots_are_captured_listed_and_guarded() {
    let fx = fixture();
    let user = alice();
    seed_golden_week(&fx.tasks, &user);

    let first = fx
        .performance
        .capture_snapshot(&user, query(2024))
        .expect("first snapshot");
    let second = fx
        .performance
        .capture_snapshot(&user, query(2024))
        .expect("second snapshot");
    assert_ne!(first.id, second.id);
    assert_eq!(first.achievement, Grade::C);
    assert!((first.overall_score - 18.9).abs() < 1e-9);

    let listed = fx
        .performance
        .list_snapshots(&user, None, None)
        .expect("list snapshots");
    assert_eq!(listed.len(), 2);
    let ids: Vec<&str> = listed.iter().map(|snapshot| snapshot.id.as_str()).collect();
    assert!(ids.contains(&first.id.as_str()));
    assert!(ids.contains(&second.id.as_str()));

    let limited = fx
        .performance
        .list_snapshots(&user, None, Some(1))
        .expect("limited list");
    assert_eq!(limited.len(), 1);

    let err = fx
        .performance
        .list_snapshots(&user, None, Some(0))
        .expect_err("zero limit");
    assert!(matches!(err, AppError::Validation { .. }));

    let fetched = fx
        .performance
        .get_snapshot(&user, &first.id)
        .expect("get snapshot");
    assert_eq!(fetched.report.months[4].task_count, 2);

    let bob = CurrentUser::new("bob", UserRole::User);
    let err = fx
        .performance
        .get_snapshot(&bob, &first.id)
        .expect_err("bob must not read alice's snapshot");
    assert!(matches!(err, AppError::Forbidden { .. }));
    assert!(fx
        .performance
        .list_snapshots(&bob, None, None)
        .expect("bob's snapshots")
        .is_empty());
}

#[test]
fn explicit_as_of_is_never_served_from_another_instant() {
    let fx = fixture();
    let user = alice();
    fx.tasks
        .create_task(
            &user,
            TaskCreateInput {
                title: "Submit invoice".into(),
                deadline: Some("2024-06-01T00:00:20Z".into()),
                created_at: Some("2024-05-27T09:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create task");

    let at = |as_of: &str| PerformanceQuery {
        month: Some(5),
        as_of: Some(as_of.into()),
        ..PerformanceQuery::for_year(2024)
    };

    let early = fx
        .performance
        .fetch_report(&user, at("2024-06-01T00:00:10Z"))
        .expect("report before deadline");
    let later = fx
        .performance
        .fetch_report(&user, at("2024-06-01T00:00:50Z"))
        .expect("report after deadline");

    assert_eq!(early.months[0].weekly_data[0].status, WeekStatus::Completed);
    assert_eq!(later.months[0].weekly_data[0].status, WeekStatus::Late);
    assert_eq!(later.as_of.to_rfc3339(), "2024-06-01T00:00:50+00:00");
    assert_eq!(fx.performance.cached_reports(), 2);

    let snapshot = fx
        .performance
        .capture_snapshot(&user, at("2024-06-01T00:00:50.250Z"))
        .expect("snapshot");
    assert_eq!(snapshot.as_of, "2024-06-01T00:00:50.250Z");
    assert_eq!(
        snapshot.report.months[0].weekly_data[0].status,
        WeekStatus::Late
    );
}
