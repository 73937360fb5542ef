pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::identity_service::IdentityProvider;

/// Opens the database under `data_dir` and wires up every service.
/// Logging is left to the caller; see [`run`].
pub fn bootstrap(data_dir: &Path, identity: Arc<dyn IdentityProvider>) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    let pool = DbPool::in_data_dir(data_dir)?;
    let state = AppState::new(pool, identity)?;
    info!(
        target: "app::bootstrap",
        data_dir = %data_dir.display(),
        "application state ready"
    );
    Ok(state)
}

/// Full startup: logging under `<data_dir>/logs`, then [`bootstrap`].
pub fn run(data_dir: &Path, identity: Arc<dyn IdentityProvider>) -> AppResult<AppState> {
    crate::utils::logger::init_logging(&data_dir.join("logs"))?;
    bootstrap(data_dir, identity)
}
