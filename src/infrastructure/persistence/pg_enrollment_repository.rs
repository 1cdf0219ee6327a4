//! PostgreSQL implementation of the enrollment repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    Enrollment, EnrollmentGrant, EnrollmentOverview, MemberEnrollment, OrderAccess,
};
use crate::domain::repositories::EnrollmentRepository;
use crate::error::AppError;

const ENROLLMENT_COLUMNS: &str = "e.id, e.user_id, e.program_id, e.order_id, e.status, \
     e.starts_at, e.expires_at, e.created_at, e.updated_at";

#[derive(FromRow)]
struct EnrollmentRow {
    id: i64,
    user_id: Uuid,
    program_id: i64,
    order_id: Option<i64>,
    status: String,
    starts_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = AppError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Enrollment {
            id: row.id,
            user_id: row.user_id,
            program_id: row.program_id,
            order_id: row.order_id,
            status: row.status.parse()?,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OverviewRow {
    #[sqlx(flatten)]
    enrollment: EnrollmentRow,
    program_slug: String,
    program_title: String,
    thumbnail_url: Option<String>,
    completed_days: i64,
    total_days: i64,
}

#[derive(FromRow)]
struct MemberRow {
    #[sqlx(flatten)]
    enrollment: EnrollmentRow,
    display_name: String,
    email: String,
    completed_days: i64,
    total_days: i64,
    last_activity: Option<DateTime<Utc>>,
}

/// Locks the (user, program) pair for the rest of the transaction and
/// returns its enrollment, if any.
///
/// The advisory lock is taken before the row is read, so a grant racing the
/// creation of the first row waits and then sees it.
pub(crate) async fn lock_enrollment(
    conn: &mut PgConnection,
    user_id: &Uuid,
    program_id: i64,
) -> Result<Option<Enrollment>, AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("enrollment:{}:{}", user_id, program_id))
        .execute(&mut *conn)
        .await?;

    let current: Option<EnrollmentRow> = sqlx::query_as(&format!(
        r#"
        SELECT {ENROLLMENT_COLUMNS}
        FROM enrollments e
        WHERE e.user_id = $1 AND e.program_id = $2
        FOR UPDATE
        "#
    ))
    .bind(user_id)
    .bind(program_id)
    .fetch_optional(&mut *conn)
    .await?;

    current.map(Enrollment::try_from).transpose()
}

/// Creates or extends an enrollment on an open connection.
///
/// Shared by [`PgEnrollmentRepository::grant`] and the order completion
/// transaction. Returns the enrollment and the access the grant added.
pub(crate) async fn grant_on(
    conn: &mut PgConnection,
    grant: &EnrollmentGrant,
    now: DateTime<Utc>,
) -> Result<(Enrollment, OrderAccess), AppError> {
    let current = lock_enrollment(&mut *conn, &grant.user_id, grant.program_id).await?;
    let period = grant.period(current.as_ref(), now);
    let access = OrderAccess::of(grant, current.as_ref(), now);

    let row: EnrollmentRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO enrollments AS e (user_id, program_id, order_id, status, starts_at, expires_at)
        VALUES ($1, $2, $3, 'active', $4, $5)
        ON CONFLICT (user_id, program_id) DO UPDATE SET
            order_id   = COALESCE(EXCLUDED.order_id, e.order_id),
            status     = 'active',
            starts_at  = EXCLUDED.starts_at,
            expires_at = EXCLUDED.expires_at,
            updated_at = now()
        RETURNING {ENROLLMENT_COLUMNS}
        "#
    ))
    .bind(grant.user_id)
    .bind(grant.program_id)
    .bind(grant.order_id)
    .bind(period.starts_at)
    .bind(period.expires_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok((row.try_into()?, access))
}

/// PostgreSQL repository for enrollments.
pub struct PgEnrollmentRepository {
    pool: Arc<PgPool>,
}

impl PgEnrollmentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentRepository for PgEnrollmentRepository {
    async fn find(&self, user_id: &Uuid, program_id: i64) -> Result<Option<Enrollment>, AppError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments e WHERE e.user_id = $1 AND e.program_id = $2"
        ))
        .bind(user_id)
        .bind(program_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn grant(&self, grant: EnrollmentGrant) -> Result<Enrollment, AppError> {
        let mut tx = self.pool.begin().await?;
        let (enrollment, _) = grant_on(&mut *tx, &grant, Utc::now()).await?;
        tx.commit().await?;

        Ok(enrollment)
    }

    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<EnrollmentOverview>, AppError> {
        let rows: Vec<OverviewRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ENROLLMENT_COLUMNS},
                p.slug AS program_slug,
                p.title AS program_title,
                p.thumbnail_url,
                (SELECT COUNT(*) FROM progress_entries pe WHERE pe.enrollment_id = e.id) AS completed_days,
                (SELECT COUNT(*) FROM blueprints b WHERE b.program_id = p.id) AS total_days
            FROM enrollments e
            JOIN programs p ON p.id = e.program_id
            WHERE e.user_id = $1
            ORDER BY e.updated_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(EnrollmentOverview {
                    enrollment: row.enrollment.try_into()?,
                    program_slug: row.program_slug,
                    program_title: row.program_title,
                    thumbnail_url: row.thumbnail_url,
                    completed_days: row.completed_days,
                    total_days: row.total_days,
                })
            })
            .collect()
    }

    async fn list_members(&self, program_id: i64) -> Result<Vec<MemberEnrollment>, AppError> {
        let rows: Vec<MemberRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ENROLLMENT_COLUMNS},
                pr.display_name,
                pr.email,
                (SELECT COUNT(*) FROM progress_entries pe WHERE pe.enrollment_id = e.id) AS completed_days,
                (SELECT COUNT(*) FROM blueprints b WHERE b.program_id = e.program_id) AS total_days,
                (SELECT MAX(pe.completed_at) FROM progress_entries pe WHERE pe.enrollment_id = e.id) AS last_activity
            FROM enrollments e
            JOIN profiles pr ON pr.id = e.user_id
            WHERE e.program_id = $1
            ORDER BY e.created_at DESC
            "#
        ))
        .bind(program_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MemberEnrollment {
                    enrollment: row.enrollment.try_into()?,
                    display_name: row.display_name,
                    email: row.email,
                    completed_days: row.completed_days,
                    total_days: row.total_days,
                    last_activity: row.last_activity,
                })
            })
            .collect()
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET status = 'expired', updated_at = now()
            WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
