//! Repository trait for programs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{NewProgram, Program, ProgramOverview, ProgramPatch, ProgramStatus};
use crate::error::AppError;

/// Repository interface for the program catalog.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgProgramRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_program.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// Creates a draft program.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the slug is already taken.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_program: NewProgram) -> Result<Program, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Program>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Program>, AppError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the program does not exist.
    async fn update(&self, id: i64, patch: ProgramPatch) -> Result<Program, AppError>;

    /// Changes the publication status.
    ///
    /// `published_at` is set the first time a program is published and kept
    /// afterwards.
    async fn set_status(&self, id: i64, status: ProgramStatus) -> Result<Program, AppError>;

    /// Hard-deletes a program with its curriculum.
    ///
    /// Returns `Ok(false)` if nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Returns true if any order references the program.
    async fn has_orders(&self, id: i64) -> Result<bool, AppError>;

    /// Published programs, newest first.
    async fn list_published(&self, page: i64, page_size: i64) -> Result<Vec<Program>, AppError>;

    async fn count_published(&self) -> Result<i64, AppError>;

    /// A coach's programs with member, day and revenue figures.
    ///
    /// `coach_id = None` lists every program (admin view).
    async fn overview(&self, coach_id: Option<Uuid>) -> Result<Vec<ProgramOverview>, AppError>;
}
