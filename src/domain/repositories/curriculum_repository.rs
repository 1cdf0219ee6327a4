//! Repository trait for blueprint days and their sections.

use async_trait::async_trait;

use crate::domain::entities::{
    Blueprint, BlueprintPatch, MoveDirection, NewBlueprint, NewSection, Section, SectionPatch,
};
use crate::error::AppError;

/// Repository interface for curriculum content.
///
/// Section positions are dense and 1-based per blueprint; every operation
/// that changes them runs in a single transaction.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgCurriculumRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_curriculum.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurriculumRepository: Send + Sync {
    /// Days of a program ordered by day number.
    async fn list_days(&self, program_id: i64) -> Result<Vec<Blueprint>, AppError>;

    async fn find_day(&self, blueprint_id: i64) -> Result<Option<Blueprint>, AppError>;

    async fn find_day_by_number(
        &self,
        program_id: i64,
        day_number: i32,
    ) -> Result<Option<Blueprint>, AppError>;

    /// Highest day number in the plan, `None` for an empty plan.
    async fn last_day_number(&self, program_id: i64) -> Result<Option<i32>, AppError>;

    async fn count_days(&self, program_id: i64) -> Result<i64, AppError>;

    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the day number is already used.
    async fn create_day(&self, new_day: NewBlueprint) -> Result<Blueprint, AppError>;

    async fn update_day(&self, blueprint_id: i64, patch: BlueprintPatch)
    -> Result<Blueprint, AppError>;

    /// Deletes a day together with its sections and progress entries.
    async fn delete_day(&self, blueprint_id: i64) -> Result<bool, AppError>;

    /// Copies a day and all of its sections to `target_day` of the same program.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the target day already exists.
    async fn copy_day(&self, source_id: i64, target_day: i32) -> Result<Blueprint, AppError>;

    /// Sections of a day ordered by position.
    async fn list_sections(&self, blueprint_id: i64) -> Result<Vec<Section>, AppError>;

    async fn find_section(&self, section_id: i64) -> Result<Option<Section>, AppError>;

    /// Appends a section after the last one.
    async fn add_section(&self, new_section: NewSection) -> Result<Section, AppError>;

    async fn update_section(&self, section_id: i64, patch: SectionPatch)
    -> Result<Section, AppError>;

    /// Deletes a section and closes the gap in positions.
    async fn delete_section(&self, section_id: i64) -> Result<bool, AppError>;

    /// Swaps a section with its neighbour.
    ///
    /// Returns `Ok(false)` when the section is already at the edge.
    async fn move_section(&self, section_id: i64, direction: MoveDirection)
    -> Result<bool, AppError>;
}
