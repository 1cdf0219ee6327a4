//! Repository trait for routine blocks and their exercises.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{
    Exercise, NewExercise, NewRoutineBlock, RoutineBlock, RoutineBlockUpdate,
};
use crate::error::AppError;

/// Repository interface for a coach's routine library.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRoutineBlockRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutineBlockRepository: Send + Sync {
    async fn create(&self, new_block: NewRoutineBlock) -> Result<RoutineBlock, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<RoutineBlock>, AppError>;

    /// Blocks with the given ids, in no particular order. Unknown ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<RoutineBlock>, AppError>;

    /// A coach's blocks ordered by name.
    async fn list_by_coach(&self, coach_id: &Uuid) -> Result<Vec<RoutineBlock>, AppError>;

    async fn update(&self, id: i64, update: RoutineBlockUpdate) -> Result<RoutineBlock, AppError>;

    /// Deletes a block. Sections referencing it keep their text and lose the reference.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Exercises of the given blocks ordered by block and position.
    async fn list_exercises(&self, block_ids: &[i64]) -> Result<Vec<Exercise>, AppError>;

    /// Appends an exercise after the block's last one.
    async fn add_exercise(&self, new_exercise: NewExercise) -> Result<Exercise, AppError>;

    /// Removes an exercise and closes the gap in positions.
    async fn remove_exercise(&self, block_id: i64, exercise_id: i64) -> Result<bool, AppError>;
}
