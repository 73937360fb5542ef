use std::collections::HashMap;
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AppResult;
use crate::models::performance::PerformanceReport;
use crate::models::task::TaskRecord;

pub const DEFAULT_REPORT_TTL_SECONDS: i64 = 60;

/// How the evaluation instant enters a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsOfKey {
    /// Instant named by the caller; only that exact instant hits.
    Exact(DateTime<Utc>),
    /// Defaulted clock reading, shared by every request in the same bucket.
    Bucketed {
        at: DateTime<Utc>,
        granularity_minutes: u32,
    },
}

impl AsOfKey {
    fn component(&self) -> String {
        match self {
            AsOfKey::Exact(at) => format!("exact:{}", at.timestamp_millis()),
            AsOfKey::Bucketed {
                at,
                granularity_minutes,
            } => format!("bucket:{}", as_of_bucket(*at, *granularity_minutes)),
        }
    }
}

/// Identity of a computed report: who, which year, which zone, which tasks and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCacheKey {
    owner_id: String,
    year: i32,
    timezone: String,
    content_hash: String,
    as_of: String,
}

impl ReportCacheKey {
    pub fn new(
        owner_id: &str,
        year: i32,
        timezone: &str,
        tasks: &[TaskRecord],
        as_of: AsOfKey,
    ) -> AppResult<Self> {
        let payload = serde_json::to_vec(tasks)?;
        let content_hash = STANDARD_NO_PAD.encode(Sha256::digest(&payload));
        Ok(Self {
            owner_id: owner_id.to_string(),
            year,
            timezone: timezone.to_string(),
            content_hash,
            as_of: as_of.component(),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Stable key (base64 encoded SHA-256).
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.owner_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.year.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(self.timezone.as_bytes());
        hasher.update(b":");
        hasher.update(self.content_hash.as_bytes());
        hasher.update(b":");
        hasher.update(self.as_of.as_bytes());
        STANDARD_NO_PAD.encode(hasher.finalize())
    }
}

impl From<&ReportCacheKey> for String {
    fn from(value: &ReportCacheKey) -> Self {
        value.cache_key()
    }
}

/// Evaluation timestamp rounded down to a multiple of `granularity_minutes`.
pub fn as_of_bucket(as_of: DateTime<Utc>, granularity_minutes: u32) -> i64 {
    let step = i64::from(granularity_minutes.max(1)) * 60;
    as_of.timestamp().div_euclid(step) * step
}

#[derive(Clone)]
struct CachedReport {
    report: PerformanceReport,
    cached_at: DateTime<Utc>,
}

pub struct ReportCache {
    entries: RwLock<HashMap<String, CachedReport>>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &ReportCacheKey) -> Option<PerformanceReport> {
        let cache_key: String = key.into();
        let now = Utc::now();
        let hit = self
            .entries
            .read()
            .ok()
            .and_then(|guard| guard.get(&cache_key).cloned())
            .and_then(|entry| {
                if now - entry.cached_at <= self.ttl {
                    Some(entry.report)
                } else {
                    None
                }
            });

        if hit.is_some() {
            debug!(
                target: "app::performance::cache",
                cache_key = %cache_key,
                owner_id = %key.owner_id(),
                "report cache hit"
            );
        }
        hit
    }

    pub fn insert(&self, key: &ReportCacheKey, report: PerformanceReport) {
        let cache_key: String = key.into();
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(
                cache_key,
                CachedReport {
                    report,
                    cached_at: Utc::now(),
                },
            );
        }
    }

    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = self.ttl;
        match self.entries.write() {
            Ok(mut guard) => {
                let before = guard.len();
                guard.retain(|_, entry| now - entry.cached_at <= ttl);
                let purged = before - guard.len();
                if purged > 0 {
                    debug!(target: "app::performance::cache", purged, "purged expired reports");
                }
                purged
            }
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_REPORT_TTL_SECONDS))
    }
}
