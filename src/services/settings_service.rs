use std::sync::RwLock;

use chrono::Utc;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::{AppSettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::ScoringSettings;
use crate::services::calendar_utils::parse_timezone;

const KEY_TIMEZONE: &str = "timezone";
const KEY_STATUS_GRANULARITY: &str = "status_granularity_minutes";

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_STATUS_GRANULARITY_MINUTES: u32 = 1;
const MAX_STATUS_GRANULARITY_MINUTES: u32 = 24 * 60;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdateInput {
    pub timezone: Option<String>,
    pub status_granularity_minutes: Option<u32>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<ScoringSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<ScoringSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let mut guard = self
            .cache
            .write()
            .map_err(|_| AppError::other("settings cache lock poisoned"))?;
        if let Some(settings) = guard.as_ref() {
            return Ok(settings.clone());
        }
        let settings = self.load_settings_from_db()?;
        *guard = Some(settings.clone());
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<ScoringSettings> {
        let timezone = match input.timezone.as_deref() {
            Some(raw) => {
                let zone = parse_timezone(raw)?;
                Some(zone.name().to_string())
            }
            None => None,
        };

        if let Some(minutes) = input.status_granularity_minutes {
            ensure_valid_granularity(minutes)?;
        }

        // Held until the merged settings are cached again.
        let mut guard = self
            .cache
            .write()
            .map_err(|_| AppError::other("settings cache lock poisoned"))?;
        let mut current = match guard.as_ref() {
            Some(settings) => settings.clone(),
            None => self.load_settings_from_db()?,
        };

        let now = Utc::now().to_rfc3339();
        self.db.with_connection(|conn| {
            if let Some(value) = timezone.as_deref() {
                SettingsRepository::upsert(conn, KEY_TIMEZONE, value, &now)?;
            }
            if let Some(value) = input.status_granularity_minutes {
                SettingsRepository::upsert(conn, KEY_STATUS_GRANULARITY, &value.to_string(), &now)?;
            }
            Ok(())
        })?;

        if let Some(value) = timezone {
            current.timezone = value;
        }
        if let Some(value) = input.status_granularity_minutes {
            current.status_granularity_minutes = value;
        }
        current.updated_at = now;
        *guard = Some(current.clone());
        drop(guard);

        info!(
            target: "app::settings",
            timezone = %current.timezone,
            status_granularity_minutes = current.status_granularity_minutes,
            "scoring settings updated"
        );
        Ok(current)
    }

    fn load_settings_from_db(&self) -> AppResult<ScoringSettings> {
        let rows = self.db.with_connection(|conn| SettingsRepository::list(conn))?;
        let find = |key: &str| rows.iter().find(|row| row.key == key);

        let timezone = match find(KEY_TIMEZONE) {
            Some(row) if row.value.parse::<Tz>().is_ok() => row.value.clone(),
            Some(row) => {
                warn!(
                    target: "app::settings",
                    value = %row.value,
                    "stored timezone is invalid, falling back to default"
                );
                DEFAULT_TIMEZONE.to_string()
            }
            None => DEFAULT_TIMEZONE.to_string(),
        };

        let status_granularity_minutes = match find(KEY_STATUS_GRANULARITY) {
            Some(row) => match row.value.parse::<u32>() {
                Ok(value) if ensure_valid_granularity(value).is_ok() => value,
                _ => {
                    warn!(
                        target: "app::settings",
                        value = %row.value,
                        "stored status granularity is invalid, falling back to default"
                    );
                    DEFAULT_STATUS_GRANULARITY_MINUTES
                }
            },
            None => DEFAULT_STATUS_GRANULARITY_MINUTES,
        };

        Ok(ScoringSettings {
            timezone,
            status_granularity_minutes,
            updated_at: latest_updated_at(&rows).unwrap_or_else(|| Utc::now().to_rfc3339()),
        })
    }
}

fn latest_updated_at(rows: &[AppSettingRow]) -> Option<String> {
    rows.iter().map(|row| row.updated_at.clone()).max()
}

fn ensure_valid_granularity(minutes: u32) -> AppResult<()> {
    if (1..=MAX_STATUS_GRANULARITY_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "statusGranularityMinutes must be between 1 and {MAX_STATUS_GRANULARITY_MINUTES}"
        )))
    }
}
