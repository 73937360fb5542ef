use crate::models::settings::ScoringSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<ScoringSettings> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.current_user()?;
        app_state.settings().get()
    })
    .await
}

pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdateInput,
) -> CommandResult<ScoringSettings> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.current_user()?;
        app_state.settings().update(payload)
    })
    .await
}
