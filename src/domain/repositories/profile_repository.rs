//! Repository trait for user profiles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{NewProfile, Profile, Role};
use crate::error::AppError;

/// Repository interface for the local profile records.
///
/// Profiles are keyed by the identity provider's user id.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgProfileRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Inserts a profile or refreshes the e-mail of an existing one.
    ///
    /// An existing display name and role are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn upsert(&self, new_profile: NewProfile) -> Result<Profile, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Profile>, AppError>;

    /// Case-insensitive lookup by e-mail.
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AppError>;

    /// Lists profiles, newest first.
    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<Profile>, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    /// Changes a user's role.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the profile does not exist.
    async fn set_role(&self, id: &Uuid, role: Role) -> Result<Profile, AppError>;
}
