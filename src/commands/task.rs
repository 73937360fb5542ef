use tracing::debug;

use crate::models::task::{
    TaskCreateInput, TaskListQuery, TaskListResponse, TaskRecord, TaskUpdateInput,
};

use super::{run_blocking, AppState, CommandResult};

pub async fn tasks_list(
    state: &AppState,
    query: Option<TaskListQuery>,
) -> CommandResult<TaskListResponse> {
    let app_state = state.clone();
    let query = query.unwrap_or_default();
    let response = run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.tasks().list_tasks(&user, query)
    })
    .await?;
    debug!(
        target: "app::command",
        total = response.total,
        returned = response.items.len(),
        "tasks_list"
    );
    Ok(response)
}

pub async fn tasks_get(state: &AppState, id: String) -> CommandResult<TaskRecord> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.tasks().get_task(&user, &id)
    })
    .await
}

pub async fn tasks_create(state: &AppState, payload: TaskCreateInput) -> CommandResult<TaskRecord> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.tasks().create_task(&user, payload)
    })
    .await
}

pub async fn tasks_update(
    state: &AppState,
    id: String,
    payload: TaskUpdateInput,
) -> CommandResult<TaskRecord> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.tasks().update_task(&user, &id, payload)
    })
    .await
}

pub async fn tasks_delete(state: &AppState, id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        let user = app_state.current_user()?;
        app_state.tasks().delete_task(&user, &id)
    })
    .await
}
