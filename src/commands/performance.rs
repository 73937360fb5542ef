use crate::models::performance::{
    MonthWeeks, OverallStats, PerformanceQuery, PerformanceReport, PerformanceSnapshotRecord,
    ReportExportParams, ReportExportResult,
};

use super::{run_blocking, AppState, CommandResult};

pub async fn performance_report_fetch(
    state: &AppState,
    query: PerformanceQuery,
) -> CommandResult<PerformanceReport> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().fetch_report(&user, query)
    })
    .await
}

pub async fn performance_weekly_fetch(
    state: &AppState,
    query: PerformanceQuery,
) -> CommandResult<Vec<MonthWeeks>> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().fetch_weekly(&user, query)
    })
    .await
}

pub async fn performance_overall_fetch(
    state: &AppState,
    query: PerformanceQuery,
) -> CommandResult<OverallStats> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().fetch_overall(&user, query)
    })
    .await
}

pub async fn performance_report_export(
    state: &AppState,
    params: ReportExportParams,
) -> CommandResult<ReportExportResult> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().export_report(&user, params)
    })
    .await
}

pub async fn performance_snapshot_capture(
    state: &AppState,
    query: PerformanceQuery,
) -> CommandResult<PerformanceSnapshotRecord> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().capture_snapshot(&user, query)
    })
    .await
}

pub async fn performance_snapshots_list(
    state: &AppState,
    owner_id: Option<String>,
    limit: Option<usize>,
) -> CommandResult<Vec<PerformanceSnapshotRecord>> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().list_snapshots(&user, owner_id, limit)
    })
    .await
}

pub async fn performance_snapshot_get(
    state: &AppState,
    id: String,
) -> CommandResult<PerformanceSnapshotRecord> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.performance().get_snapshot(&user, &id)
    })
    .await
}
