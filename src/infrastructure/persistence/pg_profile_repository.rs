//! PostgreSQL implementation of the profile repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{NewProfile, Profile, Role, page};
use crate::domain::repositories::ProfileRepository;
use crate::error::AppError;

const PROFILE_COLUMNS: &str = "id, email, display_name, role, bio, created_at, updated_at";

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    display_name: String,
    role: String,
    bio: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse()?,
            bio: row.bio,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL repository for user profiles.
pub struct PgProfileRepository {
    pool: Arc<PgPool>,
}

impl PgProfileRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn upsert(&self, new_profile: NewProfile) -> Result<Profile, AppError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO profiles (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    updated_at = CASE WHEN profiles.email = EXCLUDED.email
                                      THEN profiles.updated_at ELSE now() END
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(new_profile.id)
        .bind(&new_profile.email)
        .bind(&new_profile.display_name)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<Profile>, AppError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page_size)
        .bind(page::offset(page, page_size))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn set_role(&self, id: &Uuid, role: Role) -> Result<Profile, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r#"
            UPDATE profiles
            SET role = $2, updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Profile::try_from)
            .transpose()?
            .ok_or_else(|| AppError::not_found("Profile not found", json!({ "id": id })))
    }
}
