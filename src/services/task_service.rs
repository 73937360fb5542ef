use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};

use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{
    SortOrder, TaskCreateInput, TaskListQuery, TaskListResponse, TaskPriority, TaskRecord,
    TaskSortKey, TaskUpdateInput,
};
use crate::models::user::CurrentUser;
use crate::services::calendar_utils::parse_optional_datetime;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;
pub const DEFAULT_CATEGORY: &str = "General";

const MAX_TITLE_CHARS: usize = 160;
const MAX_CATEGORY_CHARS: usize = 48;
const MAX_ESTIMATED_HOURS: f64 = 24.0 * 30.0;

#[derive(Clone)]
pub struct TaskService {
    db: DbPool,
}

impl TaskService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_task(&self, user: &CurrentUser, input: TaskCreateInput) -> AppResult<TaskRecord> {
        let now = now_millis();
        let record = build_record_from_create(&user.id, input, now)?;

        let row = TaskRow::from_record(&record);
        self.db
            .with_connection(|conn| TaskRepository::insert(conn, &row))?;
        info!(target: "app::task", task_id = %record.id, owner_id = %record.owner_id, "task created");
        Ok(record)
    }

    pub fn update_task(
        &self,
        user: &CurrentUser,
        id: &str,
        update: TaskUpdateInput,
    ) -> AppResult<TaskRecord> {
        let mut existing = self.get_task(user, id)?;
        let now = now_millis();
        apply_update(&mut existing, update, now)?;
        existing.updated_at = now;

        let row = TaskRow::from_record(&existing);
        self.db
            .with_connection(|conn| TaskRepository::update(conn, &row))?;
        info!(target: "app::task", task_id = %existing.id, "task updated");
        Ok(existing)
    }

    pub fn delete_task(&self, user: &CurrentUser, id: &str) -> AppResult<()> {
        let existing = self.get_task(user, id)?;
        self.db
            .with_connection(|conn| TaskRepository::delete(conn, &existing.id))?;
        info!(target: "app::task", task_id = %id, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, user: &CurrentUser, id: &str) -> AppResult<TaskRecord> {
        let row = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        let record = row.into_record()?;
        if !user.can_access(&record.owner_id) {
            return Err(AppError::forbidden(format!(
                "task {id} belongs to another user"
            )));
        }
        debug!(target: "app::task", task_id = %record.id, "task fetched");
        Ok(record)
    }

    pub fn list_tasks(&self, user: &CurrentUser, query: TaskListQuery) -> AppResult<TaskListResponse> {
        let owner_id = resolve_owner(user, query.owner_id.as_deref())?;
        let records = self.tasks_for_owner(&owner_id)?;
        filter_and_paginate(records, query)
    }

    /// Every task of `owner_id`, oldest first. No access check.
    pub fn tasks_for_owner(&self, owner_id: &str) -> AppResult<Vec<TaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| TaskRepository::list_by_owner(conn, owner_id))?;
        let tasks = rows
            .into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::task", owner_id, count = tasks.len(), "owner tasks loaded");
        Ok(tasks)
    }

    pub fn pool(&self) -> &DbPool {
        &self.db
    }
}

/// Owner whose data `user` asked for. Defaults to the user's own id.
pub fn resolve_owner(user: &CurrentUser, requested: Option<&str>) -> AppResult<String> {
    match requested.map(str::trim).filter(|value| !value.is_empty()) {
        Some(owner) if user.can_access(owner) => Ok(owner.to_string()),
        Some(owner) => Err(AppError::forbidden(format!(
            "user {} may not read data of {owner}",
            user.id
        ))),
        None => Ok(user.id.clone()),
    }
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn build_record_from_create(
    owner_id: &str,
    input: TaskCreateInput,
    now: DateTime<Utc>,
) -> AppResult<TaskRecord> {
    let created_at = normalize_datetime(input.created_at.as_deref())?.unwrap_or(now);
    let completed_at = normalize_datetime(input.completed_at.as_deref())?;
    let completed = input.completed.unwrap_or(completed_at.is_some());

    let mut record = TaskRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        title: normalize_title(&input.title)?,
        description: normalize_optional_string(input.description),
        category: normalize_category(input.category.as_deref())?,
        priority: normalize_priority(input.priority.as_deref())?,
        deadline: normalize_datetime(input.deadline.as_deref())?,
        completed,
        completed_at,
        estimated_time: normalize_estimated_time(input.estimated_time)?,
        created_at,
        updated_at: now,
    };
    enforce_completion(&mut record, now);
    Ok(record)
}

fn apply_update(record: &mut TaskRecord, update: TaskUpdateInput, now: DateTime<Utc>) -> AppResult<()> {
    if let Some(title) = update.title {
        record.title = normalize_title(&title)?;
    }

    if let Some(description) = update.description {
        record.description = normalize_optional_string(description);
    }

    if let Some(category) = update.category {
        record.category = normalize_category(Some(&category))?;
    }

    if let Some(priority) = update.priority {
        record.priority = normalize_priority(Some(&priority))?;
    }

    if let Some(deadline) = update.deadline {
        record.deadline = normalize_datetime(deadline.as_deref())?;
    }

    if let Some(completed_at) = update.completed_at {
        record.completed_at = normalize_datetime(completed_at.as_deref())?;
        if update.completed.is_none() {
            record.completed = record.completed_at.is_some();
        }
    }

    if let Some(completed) = update.completed {
        record.completed = completed;
    }

    if let Some(estimated_time) = update.estimated_time {
        record.estimated_time = normalize_estimated_time(estimated_time)?;
    }

    enforce_completion(record, now);
    Ok(())
}

/// `completed_at` is present iff `completed`.
fn enforce_completion(record: &mut TaskRecord, now: DateTime<Utc>) {
    if record.completed {
        if record.completed_at.is_none() {
            record.completed_at = Some(now);
        }
    } else {
        record.completed_at = None;
    }
}

fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_category(category: Option<&str>) -> AppResult<String> {
    let value = category.map(str::trim).filter(|value| !value.is_empty());
    match value {
        Some(value) if value.chars().count() > MAX_CATEGORY_CHARS => Err(AppError::validation(
            format!("category must be at most {MAX_CATEGORY_CHARS} characters"),
        )),
        Some(value) => Ok(value.to_string()),
        None => Ok(DEFAULT_CATEGORY.to_string()),
    }
}

fn normalize_priority(priority: Option<&str>) -> AppResult<TaskPriority> {
    match priority.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => TaskPriority::parse(value),
        None => Ok(TaskPriority::default()),
    }
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_datetime(value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    Ok(parse_optional_datetime(value)?.map(|dt| dt.trunc_subsecs(3)))
}

fn normalize_estimated_time(value: Option<f64>) -> AppResult<Option<f64>> {
    match value {
        Some(hours) if !hours.is_finite() || hours <= 0.0 => Err(AppError::validation(
            "estimated time must be a positive number of hours",
        )),
        Some(hours) if hours > MAX_ESTIMATED_HOURS => Err(AppError::validation(
            "estimated time must not exceed 30 days",
        )),
        other => Ok(other),
    }
}

fn filter_and_paginate(records: Vec<TaskRecord>, query: TaskListQuery) -> AppResult<TaskListResponse> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::validation("page must be at least 1"));
    }
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::validation(format!(
            "pageSize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let filters = ListFilters::from_query(&query)?;
    let mut filtered: Vec<TaskRecord> = records
        .into_iter()
        .filter(|task| filters.matches(task))
        .collect();
    sort_tasks(&mut filtered, query.sort_by, query.sort_order);

    let total = filtered.len();
    let start = (page - 1).saturating_mul(page_size);
    let items = if start >= total {
        Vec::new()
    } else {
        let end = (start + page_size).min(total);
        filtered[start..end].to_vec()
    };

    debug!(
        target: "app::task",
        total,
        page,
        page_size,
        returned = items.len(),
        "tasks listed"
    );

    Ok(TaskListResponse {
        items,
        total,
        page,
        page_size,
    })
}

struct ListFilters {
    search: Option<String>,
    categories: HashSet<String>,
    priorities: HashSet<TaskPriority>,
    completed: Option<bool>,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
}

impl ListFilters {
    fn from_query(query: &TaskListQuery) -> AppResult<Self> {
        let categories = query
            .categories
            .iter()
            .flatten()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .collect();
        let priorities = query
            .priorities
            .iter()
            .flatten()
            .map(|value| TaskPriority::parse(value))
            .collect::<AppResult<HashSet<_>>>()?;
        let created_after = parse_optional_datetime(query.created_after.as_deref())?;
        let created_before = parse_optional_datetime(query.created_before.as_deref())?;
        if let (Some(after), Some(before)) = (created_after, created_before) {
            if after > before {
                return Err(AppError::validation("createdAfter must not be after createdBefore"));
            }
        }

        Ok(Self {
            search: query
                .search
                .as_ref()
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty()),
            categories,
            priorities,
            completed: query.completed,
            created_after,
            created_before,
        })
    }

    fn matches(&self, task: &TaskRecord) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&task.category.to_lowercase()) {
            return false;
        }

        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }

        if let Some(completed) = self.completed {
            if task.completed != completed {
                return false;
            }
        }

        if let Some(search) = self.search.as_deref() {
            let in_title = task.title.to_lowercase().contains(search);
            let in_description = task
                .description
                .as_ref()
                .map(|desc| desc.to_lowercase().contains(search))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }

        if self.created_after.map(|bound| task.created_at < bound).unwrap_or(false) {
            return false;
        }

        if self.created_before.map(|bound| task.created_at > bound).unwrap_or(false) {
            return false;
        }

        true
    }
}

fn sort_tasks(tasks: &mut [TaskRecord], sort_by: TaskSortKey, sort_order: SortOrder) {
    tasks.sort_by(|a, b| {
        let ordering = match sort_by {
            TaskSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            TaskSortKey::Deadline => compare_option(a.deadline, b.deadline),
            TaskSortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            TaskSortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        };

        match sort_order {
            SortOrder::Desc => ordering.reverse(),
            SortOrder::Asc => ordering,
        }
    });
}

fn compare_option(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
