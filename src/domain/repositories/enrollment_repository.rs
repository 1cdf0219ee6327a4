//! Repository trait for enrollments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    Enrollment, EnrollmentGrant, EnrollmentOverview, MemberEnrollment,
};
use crate::error::AppError;

/// Repository interface for enrollments.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgEnrollmentRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_enrollment.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find(&self, user_id: &Uuid, program_id: i64) -> Result<Option<Enrollment>, AppError>;

    /// Creates or extends the user's enrollment.
    ///
    /// The current row is locked while the new access period is computed with
    /// [`EnrollmentGrant::period`].
    async fn grant(&self, grant: EnrollmentGrant) -> Result<Enrollment, AppError>;

    /// A user's enrollments with program info and completion counts.
    async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<EnrollmentOverview>, AppError>;

    /// Members of a program with their progress.
    async fn list_members(&self, program_id: i64) -> Result<Vec<MemberEnrollment>, AppError>;

    /// Marks active enrollments with `expires_at <= now` as expired.
    ///
    /// Returns the number of rows updated.
    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
