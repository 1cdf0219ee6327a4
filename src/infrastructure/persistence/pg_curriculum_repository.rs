//! PostgreSQL implementation of the curriculum repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{
    Blueprint, BlueprintPatch, MoveDirection, NewBlueprint, NewSection, Section, SectionPatch,
};
use crate::domain::repositories::CurriculumRepository;
use crate::error::AppError;

const BLUEPRINT_COLUMNS: &str =
    "id, program_id, day_number, title, notes, is_rest_day, created_at, updated_at";

const SECTION_COLUMNS: &str =
    "id, blueprint_id, position, kind, title, body, routine_block_id, created_at";

#[derive(FromRow)]
struct BlueprintRow {
    id: i64,
    program_id: i64,
    day_number: i32,
    title: String,
    notes: Option<String>,
    is_rest_day: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BlueprintRow> for Blueprint {
    fn from(row: BlueprintRow) -> Self {
        Blueprint {
            id: row.id,
            program_id: row.program_id,
            day_number: row.day_number,
            title: row.title,
            notes: row.notes,
            is_rest_day: row.is_rest_day,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SectionRow {
    id: i64,
    blueprint_id: i64,
    position: i32,
    kind: String,
    title: String,
    body: Option<String>,
    routine_block_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SectionRow> for Section {
    type Error = AppError;

    fn try_from(row: SectionRow) -> Result<Self, Self::Error> {
        Ok(Section {
            id: row.id,
            blueprint_id: row.blueprint_id,
            position: row.position,
            kind: row.kind.parse()?,
            title: row.title,
            body: row.body,
            routine_block_id: row.routine_block_id,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL repository for blueprint days and sections.
///
/// The `(blueprint_id, position)` unique constraint is deferrable, so position
/// shifts and swaps are single statements checked at statement end.
pub struct PgCurriculumRepository {
    pool: Arc<PgPool>,
}

impl PgCurriculumRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurriculumRepository for PgCurriculumRepository {
    async fn list_days(&self, program_id: i64) -> Result<Vec<Blueprint>, AppError> {
        let rows: Vec<BlueprintRow> = sqlx::query_as(&format!(
            "SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE program_id = $1 ORDER BY day_number"
        ))
        .bind(program_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Blueprint::from).collect())
    }

    async fn find_day(&self, blueprint_id: i64) -> Result<Option<Blueprint>, AppError> {
        let row: Option<BlueprintRow> = sqlx::query_as(&format!(
            "SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE id = $1"
        ))
        .bind(blueprint_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Blueprint::from))
    }

    async fn find_day_by_number(
        &self,
        program_id: i64,
        day_number: i32,
    ) -> Result<Option<Blueprint>, AppError> {
        let row: Option<BlueprintRow> = sqlx::query_as(&format!(
            "SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE program_id = $1 AND day_number = $2"
        ))
        .bind(program_id)
        .bind(day_number)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Blueprint::from))
    }

    async fn last_day_number(&self, program_id: i64) -> Result<Option<i32>, AppError> {
        let last: Option<i32> =
            sqlx::query_scalar("SELECT MAX(day_number) FROM blueprints WHERE program_id = $1")
                .bind(program_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(last)
    }

    async fn count_days(&self, program_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blueprints WHERE program_id = $1")
            .bind(program_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn create_day(&self, new_day: NewBlueprint) -> Result<Blueprint, AppError> {
        let row: BlueprintRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO blueprints (program_id, day_number, title, notes, is_rest_day)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BLUEPRINT_COLUMNS}
            "#
        ))
        .bind(new_day.program_id)
        .bind(new_day.day_number)
        .bind(&new_day.title)
        .bind(&new_day.notes)
        .bind(new_day.is_rest_day)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| day_conflict(e, new_day.day_number))?;

        Ok(row.into())
    }

    async fn update_day(
        &self,
        blueprint_id: i64,
        patch: BlueprintPatch,
    ) -> Result<Blueprint, AppError> {
        let row: Option<BlueprintRow> = sqlx::query_as(&format!(
            r#"
            UPDATE blueprints SET
                title       = COALESCE($2, title),
                notes       = CASE WHEN $3 THEN $4 ELSE notes END,
                is_rest_day = COALESCE($5, is_rest_day),
                updated_at  = now()
            WHERE id = $1
            RETURNING {BLUEPRINT_COLUMNS}
            "#
        ))
        .bind(blueprint_id)
        .bind(patch.title)
        .bind(patch.notes.is_some())
        .bind(patch.notes.flatten())
        .bind(patch.is_rest_day)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Blueprint::from).ok_or_else(|| {
            AppError::not_found("Day not found", json!({ "blueprint_id": blueprint_id }))
        })
    }

    async fn delete_day(&self, blueprint_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blueprints WHERE id = $1")
            .bind(blueprint_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn copy_day(&self, source_id: i64, target_day: i32) -> Result<Blueprint, AppError> {
        let mut tx = self.pool.begin().await?;

        let copied: Option<BlueprintRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO blueprints (program_id, day_number, title, notes, is_rest_day)
            SELECT program_id, $2, title, notes, is_rest_day
            FROM blueprints
            WHERE id = $1
            RETURNING {BLUEPRINT_COLUMNS}
            "#
        ))
        .bind(source_id)
        .bind(target_day)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| day_conflict(e, target_day))?;

        let copied = copied.ok_or_else(|| {
            AppError::not_found("Day not found", json!({ "blueprint_id": source_id }))
        })?;

        sqlx::query(
            r#"
            INSERT INTO sections (blueprint_id, position, kind, title, body, routine_block_id)
            SELECT $2, position, kind, title, body, routine_block_id
            FROM sections
            WHERE blueprint_id = $1
            ORDER BY position
            "#,
        )
        .bind(source_id)
        .bind(copied.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(copied.into())
    }

    async fn list_sections(&self, blueprint_id: i64) -> Result<Vec<Section>, AppError> {
        let rows: Vec<SectionRow> = sqlx::query_as(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE blueprint_id = $1 ORDER BY position"
        ))
        .bind(blueprint_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(Section::try_from).collect()
    }

    async fn find_section(&self, section_id: i64) -> Result<Option<Section>, AppError> {
        let row: Option<SectionRow> =
            sqlx::query_as(&format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = $1"))
                .bind(section_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(Section::try_from).transpose()
    }

    async fn add_section(&self, new_section: NewSection) -> Result<Section, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serializes appends to the same day.
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM blueprints WHERE id = $1 FOR UPDATE")
                .bind(new_section.blueprint_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Err(AppError::not_found(
                "Day not found",
                json!({ "blueprint_id": new_section.blueprint_id }),
            ));
        }

        let row: SectionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO sections (blueprint_id, position, kind, title, body, routine_block_id)
            SELECT $1, COALESCE(MAX(position), 0) + 1, $2, $3, $4, $5
            FROM sections
            WHERE blueprint_id = $1
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(new_section.blueprint_id)
        .bind(new_section.kind.as_str())
        .bind(&new_section.title)
        .bind(&new_section.body)
        .bind(new_section.routine_block_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn update_section(
        &self,
        section_id: i64,
        patch: SectionPatch,
    ) -> Result<Section, AppError> {
        let row: Option<SectionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE sections SET
                kind             = COALESCE($2, kind),
                title            = COALESCE($3, title),
                body             = CASE WHEN $4 THEN $5 ELSE body END,
                routine_block_id = CASE WHEN $6 THEN $7 ELSE routine_block_id END
            WHERE id = $1
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(section_id)
        .bind(patch.kind.map(|k| k.as_str()))
        .bind(patch.title)
        .bind(patch.body.is_some())
        .bind(patch.body.flatten())
        .bind(patch.routine_block_id.is_some())
        .bind(patch.routine_block_id.flatten())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Section::try_from).transpose()?.ok_or_else(|| {
            AppError::not_found("Section not found", json!({ "section_id": section_id }))
        })
    }

    async fn delete_section(&self, section_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted: Option<(i64, i32)> = sqlx::query_as(
            "DELETE FROM sections WHERE id = $1 RETURNING blueprint_id, position",
        )
        .bind(section_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((blueprint_id, position)) = deleted else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE sections SET position = position - 1 WHERE blueprint_id = $1 AND position > $2",
        )
        .bind(blueprint_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    async fn move_section(
        &self,
        section_id: i64,
        direction: MoveDirection,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64, i32)> = sqlx::query_as(
            "SELECT blueprint_id, position FROM sections WHERE id = $1 FOR UPDATE",
        )
        .bind(section_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (blueprint_id, position) = current.ok_or_else(|| {
            AppError::not_found("Section not found", json!({ "section_id": section_id }))
        })?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sections WHERE blueprint_id = $1")
            .bind(blueprint_id)
            .fetch_one(&mut *tx)
            .await?;

        let Some(target) = direction.target_position(position, count as i32) else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            UPDATE sections
            SET position = CASE WHEN position = $2 THEN $3 ELSE $2 END
            WHERE blueprint_id = $1 AND position IN ($2, $3)
            "#,
        )
        .bind(blueprint_id)
        .bind(position)
        .bind(target)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }
}

fn day_conflict(e: sqlx::Error, day_number: i32) -> AppError {
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        return AppError::conflict("Day already exists", json!({ "day_number": day_number }));
    }
    e.into()
}
