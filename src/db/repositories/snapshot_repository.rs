use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::performance::{Grade, PerformanceSnapshotRecord};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        owner_id,
        year,
        as_of,
        overall_score,
        achievement,
        report_json,
        created_at
    FROM performance_snapshots
"#;

#[derive(Debug, Clone)]
pub struct PerformanceSnapshotRow {
    pub id: String,
    pub owner_id: String,
    pub year: i32,
    pub as_of: String,
    pub overall_score: f64,
    pub achievement: String,
    pub report_json: String,
    pub created_at: String,
}

impl PerformanceSnapshotRow {
    pub fn from_record(record: &PerformanceSnapshotRecord) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            year: record.year,
            as_of: record.as_of.clone(),
            overall_score: record.overall_score,
            achievement: record.achievement.as_str().to_string(),
            report_json: serde_json::to_string(&record.report)?,
            created_at: record.created_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<PerformanceSnapshotRecord> {
        Ok(PerformanceSnapshotRecord {
            achievement: parse_grade(&self.achievement)?,
            report: serde_json::from_str(&self.report_json)?,
            id: self.id,
            owner_id: self.owner_id,
            year: self.year,
            as_of: self.as_of,
            overall_score: self.overall_score,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for PerformanceSnapshotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            year: row.get("year")?,
            as_of: row.get("as_of")?,
            overall_score: row.get("overall_score")?,
            achievement: row.get("achievement")?,
            report_json: row.get("report_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct SnapshotRepository;

impl SnapshotRepository {
    pub fn insert(conn: &Connection, row: &PerformanceSnapshotRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO performance_snapshots (
                    id,
                    owner_id,
                    year,
                    as_of,
                    overall_score,
                    achievement,
                    report_json,
                    created_at
                ) VALUES (
                    :id,
                    :owner_id,
                    :year,
                    :as_of,
                    :overall_score,
                    :achievement,
                    :report_json,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":owner_id": &row.owner_id,
                ":year": row.year,
                ":as_of": &row.as_of,
                ":overall_score": row.overall_score,
                ":achievement": &row.achievement,
                ":report_json": &row.report_json,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<PerformanceSnapshotRow>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1"))?;
        let row = stmt
            .query_row([id], |row| PerformanceSnapshotRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// Newest first, optionally narrowed to one owner.
    pub fn list(
        conn: &Connection,
        owner_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<PerformanceSnapshotRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match owner_id {
            Some(owner) => {
                let mut stmt = conn.prepare(&format!(
                    "{BASE_SELECT} WHERE owner_id = :owner_id ORDER BY created_at DESC, id DESC LIMIT :limit"
                ))?;
                let rows = stmt
                    .query_map(
                        named_params! {":owner_id": owner, ":limit": limit},
                        |row| PerformanceSnapshotRow::try_from(row),
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{BASE_SELECT} ORDER BY created_at DESC, id DESC LIMIT :limit"
                ))?;
                let rows = stmt
                    .query_map(named_params! {":limit": limit}, |row| {
                        PerformanceSnapshotRow::try_from(row)
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(rows)
    }
}

fn parse_grade(raw: &str) -> AppResult<Grade> {
    match raw {
        "A+" => Ok(Grade::APlus),
        "A" => Ok(Grade::A),
        "B+" => Ok(Grade::BPlus),
        "B" => Ok(Grade::B),
        "C" => Ok(Grade::C),
        other => Err(AppError::database(format!("unknown achievement grade `{other}`"))),
    }
}
