//! PostgreSQL implementation of the program repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    NewProgram, Program, ProgramOverview, ProgramPatch, ProgramStatus, page,
};
use crate::domain::repositories::ProgramRepository;
use crate::error::AppError;

const PROGRAM_COLUMNS: &str = "p.id, p.coach_id, p.slug, p.title, p.summary, \
     p.description, p.price, p.currency, p.access_days, p.thumbnail_url, p.status, \
     p.published_at, p.created_at, p.updated_at";

#[derive(FromRow)]
struct ProgramRow {
    id: i64,
    coach_id: Uuid,
    slug: String,
    title: String,
    summary: Option<String>,
    description: String,
    price: i64,
    currency: String,
    access_days: Option<i32>,
    thumbnail_url: Option<String>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgramRow> for Program {
    type Error = AppError;

    fn try_from(row: ProgramRow) -> Result<Self, Self::Error> {
        Ok(Program {
            id: row.id,
            coach_id: row.coach_id,
            slug: row.slug,
            title: row.title,
            summary: row.summary,
            description: row.description,
            price: row.price,
            currency: row.currency,
            access_days: row.access_days,
            thumbnail_url: row.thumbnail_url,
            status: row.status.parse()?,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OverviewRow {
    #[sqlx(flatten)]
    program: ProgramRow,
    active_members: i64,
    days: i64,
    revenue: i64,
}

/// PostgreSQL repository for programs.
pub struct PgProgramRepository {
    pool: Arc<PgPool>,
}

impl PgProgramRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn not_found(id: i64) -> AppError {
        AppError::not_found("Program not found", json!({ "program_id": id }))
    }
}

#[async_trait]
impl ProgramRepository for PgProgramRepository {
    async fn create(&self, new_program: NewProgram) -> Result<Program, AppError> {
        let row: ProgramRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO programs AS p
                (coach_id, slug, title, summary, description, price, currency, access_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(new_program.coach_id)
        .bind(&new_program.slug)
        .bind(&new_program.title)
        .bind(&new_program.summary)
        .bind(&new_program.description)
        .bind(new_program.price)
        .bind(&new_program.currency)
        .bind(new_program.access_days)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Program>, AppError> {
        let row: Option<ProgramRow> =
            sqlx::query_as(&format!("SELECT {PROGRAM_COLUMNS} FROM programs p WHERE p.id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(Program::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Program>, AppError> {
        let row: Option<ProgramRow> = sqlx::query_as(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Program::try_from).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM programs WHERE slug = $1)")
                .bind(slug)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(exists)
    }

    async fn update(&self, id: i64, patch: ProgramPatch) -> Result<Program, AppError> {
        let row: Option<ProgramRow> = sqlx::query_as(&format!(
            r#"
            UPDATE programs AS p SET
                title         = COALESCE($2, p.title),
                summary       = CASE WHEN $3 THEN $4 ELSE p.summary END,
                description   = COALESCE($5, p.description),
                price         = COALESCE($6, p.price),
                access_days   = CASE WHEN $7 THEN $8 ELSE p.access_days END,
                thumbnail_url = CASE WHEN $9 THEN $10 ELSE p.thumbnail_url END,
                updated_at    = now()
            WHERE p.id = $1
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.summary.is_some())
        .bind(patch.summary.flatten())
        .bind(patch.description)
        .bind(patch.price)
        .bind(patch.access_days.is_some())
        .bind(patch.access_days.flatten())
        .bind(patch.thumbnail_url.is_some())
        .bind(patch.thumbnail_url.flatten())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Program::try_from)
            .transpose()?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn set_status(&self, id: i64, status: ProgramStatus) -> Result<Program, AppError> {
        let row: Option<ProgramRow> = sqlx::query_as(&format!(
            r#"
            UPDATE programs AS p SET
                status       = $2,
                published_at = CASE WHEN $2 = 'published'
                                    THEN COALESCE(p.published_at, now())
                                    ELSE p.published_at END,
                updated_at   = now()
            WHERE p.id = $1
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Program::try_from)
            .transpose()?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM programs WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_orders(&self, id: i64) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE program_id = $1)")
                .bind(id)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(exists)
    }

    async fn list_published(&self, page: i64, page_size: i64) -> Result<Vec<Program>, AppError> {
        let rows: Vec<ProgramRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PROGRAM_COLUMNS}
            FROM programs p
            WHERE p.status = 'published'
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page_size)
        .bind(page::offset(page, page_size))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(Program::try_from).collect()
    }

    async fn count_published(&self) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM programs WHERE status = 'published'")
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count)
    }

    async fn overview(&self, coach_id: Option<Uuid>) -> Result<Vec<ProgramOverview>, AppError> {
        let rows: Vec<OverviewRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PROGRAM_COLUMNS},
                (SELECT COUNT(*) FROM enrollments e
                  WHERE e.program_id = p.id AND e.status = 'active'
                    AND (e.expires_at IS NULL OR e.expires_at > now())) AS active_members,
                (SELECT COUNT(*) FROM blueprints b WHERE b.program_id = p.id) AS days,
                (SELECT COALESCE(SUM(o.amount), 0)::BIGINT FROM orders o
                  WHERE o.program_id = p.id AND o.status = 'paid') AS revenue
            FROM programs p
            WHERE ($1::uuid IS NULL OR p.coach_id = $1)
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(coach_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProgramOverview {
                    program: row.program.try_into()?,
                    active_members: row.active_members,
                    days: row.days,
                    revenue: row.revenue,
                })
            })
            .collect()
    }
}
