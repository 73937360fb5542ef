use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(AppError::validation(format!(
                "priority must be one of high, medium, low (got `{other}`)"
            ))),
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Medium => 1,
            TaskPriority::Low => 2,
        }
    }
}

/// A task as stored by the task store and read by the scoring engine.
///
/// `created_at` anchors the task to a week and month; `deadline` only drives the
/// late/overdue status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Estimated effort in hours.
    pub estimated_time: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Planned tasks carry a non-blank description and a positive time estimate.
    pub fn is_planned(&self) -> bool {
        let described = self
            .description
            .as_deref()
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false);
        let estimated = self
            .estimated_time
            .map(|hours| hours.is_finite() && hours > 0.0)
            .unwrap_or(false);
        described && estimated
    }

    /// Reporting credit needs both the flag and the timestamp; upstream rows may carry
    /// only one of them.
    pub fn is_reported(&self) -> bool {
        self.completed && self.completed_at.is_some()
    }

    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        !self.completed && self.deadline.map(|due| due < as_of).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<f64>,
    /// Imported tasks keep their original creation time.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<Option<String>>,
    #[serde(default)]
    pub estimated_time: Option<Option<f64>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Deadline,
    Priority,
    Title,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskListQuery {
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub categories: Option<Vec<String>>,
    pub priorities: Option<Vec<String>>,
    pub completed: Option<bool>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub sort_by: TaskSortKey,
    pub sort_order: SortOrder,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            search: None,
            owner_id: None,
            categories: None,
            priorities: None,
            completed: None,
            created_after: None,
            created_before: None,
            sort_by: TaskSortKey::CreatedAt,
            sort_order: SortOrder::Desc,
            page: Some(1),
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub items: Vec<TaskRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
