//! Repository trait for progress entries.

use async_trait::async_trait;

use crate::domain::entities::{NewProgressEntry, ProgressEntry};
use crate::error::AppError;

/// Repository interface for per-day completion records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgProgressRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Records a completed day, refreshing `completed_at`, result and note if
    /// the day was already completed.
    async fn upsert(&self, entry: NewProgressEntry) -> Result<ProgressEntry, AppError>;

    /// Returns `Ok(false)` if the day was not completed.
    async fn delete(&self, enrollment_id: i64, blueprint_id: i64) -> Result<bool, AppError>;

    /// Entries of an enrollment ordered by day number.
    async fn list(&self, enrollment_id: i64) -> Result<Vec<ProgressEntry>, AppError>;
}
