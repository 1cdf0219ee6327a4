//! PostgreSQL implementation of the progress repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{NewProgressEntry, ProgressEntry};
use crate::domain::repositories::ProgressRepository;
use crate::error::AppError;

#[derive(FromRow)]
struct ProgressRow {
    id: i64,
    enrollment_id: i64,
    blueprint_id: i64,
    day_number: i32,
    result: Option<String>,
    note: Option<String>,
    completed_at: DateTime<Utc>,
}

impl From<ProgressRow> for ProgressEntry {
    fn from(row: ProgressRow) -> Self {
        ProgressEntry {
            id: row.id,
            enrollment_id: row.enrollment_id,
            blueprint_id: row.blueprint_id,
            day_number: row.day_number,
            result: row.result,
            note: row.note,
            completed_at: row.completed_at,
        }
    }
}

/// PostgreSQL repository for progress entries.
pub struct PgProgressRepository {
    pool: Arc<PgPool>,
}

impl PgProgressRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn upsert(&self, entry: NewProgressEntry) -> Result<ProgressEntry, AppError> {
        let row: ProgressRow = sqlx::query_as(
            r#"
            WITH pe AS (
                INSERT INTO progress_entries (enrollment_id, blueprint_id, result, note)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (enrollment_id, blueprint_id) DO UPDATE SET
                    result = EXCLUDED.result,
                    note = EXCLUDED.note,
                    completed_at = now()
                RETURNING *
            )
            SELECT pe.id, pe.enrollment_id, pe.blueprint_id, b.day_number,
                   pe.result, pe.note, pe.completed_at
            FROM pe
            JOIN blueprints b ON b.id = pe.blueprint_id
            "#,
        )
        .bind(entry.enrollment_id)
        .bind(entry.blueprint_id)
        .bind(&entry.result)
        .bind(&entry.note)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, enrollment_id: i64, blueprint_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM progress_entries WHERE enrollment_id = $1 AND blueprint_id = $2",
        )
        .bind(enrollment_id)
        .bind(blueprint_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, enrollment_id: i64) -> Result<Vec<ProgressEntry>, AppError> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            r#"
            SELECT pe.id, pe.enrollment_id, pe.blueprint_id, b.day_number,
                   pe.result, pe.note, pe.completed_at
            FROM progress_entries pe
            JOIN blueprints b ON b.id = pe.blueprint_id
            WHERE pe.enrollment_id = $1
            ORDER BY b.day_number
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ProgressEntry::from).collect())
    }
}
