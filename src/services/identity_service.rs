use std::sync::RwLock;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::user::CurrentUser;

/// Source of the signed-in user. Authentication itself happens elsewhere.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> AppResult<CurrentUser>;
}

/// In-process session holding at most one signed-in user.
#[derive(Default)]
pub struct SessionIdentity {
    user: RwLock<Option<CurrentUser>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: CurrentUser) {
        info!(target: "app::auth", user_id = %user.id, role = user.role.as_str(), "user signed in");
        if let Ok(mut guard) = self.user.write() {
            *guard = Some(user);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.user.write() {
            if let Some(user) = guard.take() {
                info!(target: "app::auth", user_id = %user.id, "user signed out");
            }
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> AppResult<CurrentUser> {
        self.user
            .read()
            .map_err(|_| AppError::other("session lock poisoned"))?
            .clone()
            .ok_or_else(AppError::unauthorized)
    }
}
