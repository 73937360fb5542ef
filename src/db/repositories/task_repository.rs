use std::convert::TryFrom;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::{TaskPriority, TaskRecord};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        owner_id,
        title,
        description,
        category,
        priority,
        deadline,
        completed,
        completed_at,
        estimated_time,
        created_at,
        updated_at
    FROM tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub priority: String,
    pub deadline: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub estimated_time: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            category: record.category.clone(),
            priority: record.priority.as_str().to_string(),
            deadline: record.deadline.map(format_timestamp),
            completed: record.completed,
            completed_at: record.completed_at.map(format_timestamp),
            estimated_time: record.estimated_time,
            created_at: format_timestamp(record.created_at),
            updated_at: format_timestamp(record.updated_at),
        }
    }

    pub fn into_record(self) -> AppResult<TaskRecord> {
        Ok(TaskRecord {
            priority: TaskPriority::parse(&self.priority)
                .map_err(|_| AppError::database(format!("task {} has priority `{}`", self.id, self.priority)))?,
            deadline: parse_optional_column(self.deadline.as_deref(), "deadline")?,
            completed_at: parse_optional_column(self.completed_at.as_deref(), "completed_at")?,
            created_at: parse_column(&self.created_at, "created_at")?,
            updated_at: parse_column(&self.updated_at, "updated_at")?,
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            category: self.category,
            completed: self.completed,
            estimated_time: self.estimated_time,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            priority: row.get("priority")?,
            deadline: row.get("deadline")?,
            completed: row.get::<_, i64>("completed")? != 0,
            completed_at: row.get("completed_at")?,
            estimated_time: row.get("estimated_time")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    owner_id,
                    title,
                    description,
                    category,
                    priority,
                    deadline,
                    completed,
                    completed_at,
                    estimated_time,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :owner_id,
                    :title,
                    :description,
                    :category,
                    :priority,
                    :deadline,
                    :completed,
                    :completed_at,
                    :estimated_time,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":owner_id": &row.owner_id,
                ":title": &row.title,
                ":description": &row.description,
                ":category": &row.category,
                ":priority": &row.priority,
                ":deadline": &row.deadline,
                ":completed": row.completed as i64,
                ":completed_at": &row.completed_at,
                ":estimated_time": &row.estimated_time,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    title = :title,
                    description = :description,
                    category = :category,
                    priority = :priority,
                    deadline = :deadline,
                    completed = :completed,
                    completed_at = :completed_at,
                    estimated_time = :estimated_time,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":description": &row.description,
                ":category": &row.category,
                ":priority": &row.priority,
                ":deadline": &row.deadline,
                ":completed": row.completed as i64,
                ":completed_at": &row.completed_at,
                ":estimated_time": &row.estimated_time,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// Rows of one owner, oldest first.
    pub fn list_by_owner(conn: &Connection, owner_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE owner_id = ?1 ORDER BY created_at ASC, id ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([owner_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_column(raw: &str, column: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid {column} `{raw}`: {err}")))
}

fn parse_optional_column(raw: Option<&str>, column: &str) -> AppResult<Option<DateTime<Utc>>> {
    match raw.filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(parse_column(value, column)?)),
        None => Ok(None),
    }
}
