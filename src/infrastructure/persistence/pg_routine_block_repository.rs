//! PostgreSQL implementation of the routine block repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    Exercise, NewExercise, NewRoutineBlock, RoutineBlock, RoutineBlockUpdate,
};
use crate::domain::repositories::RoutineBlockRepository;
use crate::error::AppError;

const BLOCK_COLUMNS: &str =
    "id, coach_id, name, format, time_cap_minutes, rounds, description, created_at, updated_at";

const EXERCISE_COLUMNS: &str = "id, routine_block_id, position, name, reps, load, notes";

#[derive(FromRow)]
struct RoutineBlockRow {
    id: i64,
    coach_id: Uuid,
    name: String,
    format: String,
    time_cap_minutes: Option<i32>,
    rounds: Option<i32>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoutineBlockRow> for RoutineBlock {
    type Error = AppError;

    fn try_from(row: RoutineBlockRow) -> Result<Self, Self::Error> {
        Ok(RoutineBlock {
            id: row.id,
            coach_id: row.coach_id,
            name: row.name,
            format: row.format.parse()?,
            time_cap_minutes: row.time_cap_minutes,
            rounds: row.rounds,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ExerciseRow {
    id: i64,
    routine_block_id: i64,
    position: i32,
    name: String,
    reps: Option<String>,
    load: Option<String>,
    notes: Option<String>,
}

impl From<ExerciseRow> for Exercise {
    fn from(row: ExerciseRow) -> Self {
        Exercise {
            id: row.id,
            routine_block_id: row.routine_block_id,
            position: row.position,
            name: row.name,
            reps: row.reps,
            load: row.load,
            notes: row.notes,
        }
    }
}

/// PostgreSQL repository for routine blocks.
pub struct PgRoutineBlockRepository {
    pool: Arc<PgPool>,
}

impl PgRoutineBlockRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoutineBlockRepository for PgRoutineBlockRepository {
    async fn create(&self, new_block: NewRoutineBlock) -> Result<RoutineBlock, AppError> {
        let row: RoutineBlockRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO routine_blocks (coach_id, name, format, time_cap_minutes, rounds, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BLOCK_COLUMNS}
            "#
        ))
        .bind(new_block.coach_id)
        .bind(&new_block.name)
        .bind(new_block.format.as_str())
        .bind(new_block.time_cap_minutes)
        .bind(new_block.rounds)
        .bind(&new_block.description)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RoutineBlock>, AppError> {
        let row: Option<RoutineBlockRow> =
            sqlx::query_as(&format!("SELECT {BLOCK_COLUMNS} FROM routine_blocks WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(RoutineBlock::try_from).transpose()
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<RoutineBlock>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RoutineBlockRow> = sqlx::query_as(&format!(
            "SELECT {BLOCK_COLUMNS} FROM routine_blocks WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(RoutineBlock::try_from).collect()
    }

    async fn list_by_coach(&self, coach_id: &Uuid) -> Result<Vec<RoutineBlock>, AppError> {
        let rows: Vec<RoutineBlockRow> = sqlx::query_as(&format!(
            "SELECT {BLOCK_COLUMNS} FROM routine_blocks WHERE coach_id = $1 ORDER BY lower(name), id"
        ))
        .bind(coach_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(RoutineBlock::try_from).collect()
    }

    async fn update(&self, id: i64, update: RoutineBlockUpdate) -> Result<RoutineBlock, AppError> {
        let row: Option<RoutineBlockRow> = sqlx::query_as(&format!(
            r#"
            UPDATE routine_blocks SET
                name = $2,
                format = $3,
                time_cap_minutes = $4,
                rounds = $5,
                description = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING {BLOCK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.format.as_str())
        .bind(update.time_cap_minutes)
        .bind(update.rounds)
        .bind(&update.description)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RoutineBlock::try_from)
            .transpose()?
            .ok_or_else(|| AppError::not_found("Routine block not found", json!({ "id": id })))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM routine_blocks WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_exercises(&self, block_ids: &[i64]) -> Result<Vec<Exercise>, AppError> {
        if block_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ExerciseRow> = sqlx::query_as(&format!(
            r#"
            SELECT {EXERCISE_COLUMNS}
            FROM routine_exercises
            WHERE routine_block_id = ANY($1)
            ORDER BY routine_block_id, position
            "#
        ))
        .bind(block_ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Exercise::from).collect())
    }

    async fn add_exercise(&self, new_exercise: NewExercise) -> Result<Exercise, AppError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM routine_blocks WHERE id = $1 FOR UPDATE")
                .bind(new_exercise.routine_block_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Err(AppError::not_found(
                "Routine block not found",
                json!({ "id": new_exercise.routine_block_id }),
            ));
        }

        let row: ExerciseRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO routine_exercises (routine_block_id, position, name, reps, load, notes)
            SELECT $1, COALESCE(MAX(position), 0) + 1, $2, $3, $4, $5
            FROM routine_exercises
            WHERE routine_block_id = $1
            RETURNING {EXERCISE_COLUMNS}
            "#
        ))
        .bind(new_exercise.routine_block_id)
        .bind(&new_exercise.name)
        .bind(&new_exercise.reps)
        .bind(&new_exercise.load)
        .bind(&new_exercise.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE routine_blocks SET updated_at = now() WHERE id = $1")
            .bind(new_exercise.routine_block_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn remove_exercise(&self, block_id: i64, exercise_id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let position: Option<i32> = sqlx::query_scalar(
            "DELETE FROM routine_exercises WHERE id = $1 AND routine_block_id = $2 RETURNING position",
        )
        .bind(exercise_id)
        .bind(block_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(position) = position else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            UPDATE routine_exercises
            SET position = position - 1
            WHERE routine_block_id = $1 AND position > $2
            "#,
        )
        .bind(block_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }
}
