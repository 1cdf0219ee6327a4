//! Routine block library.

use serde::Deserialize;
use serde_json::json;
use serde_with::{DisplayFromStr, NoneAsEmptyString, serde_as};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::services::authorization::{clean_optional, require_author, require_manager};
use crate::domain::entities::{
    Exercise, NewExercise, NewRoutineBlock, Profile, RoutineBlock, RoutineBlockDetail,
    RoutineBlockUpdate, WorkoutFormat,
};
use crate::domain::repositories::RoutineBlockRepository;
use crate::error::AppError;

#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoutineInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: String,

    #[serde_as(as = "DisplayFromStr")]
    pub format: WorkoutFormat,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub time_cap_minutes: Option<i32>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub rounds: Option<i32>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExerciseInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: String,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 60))]
    pub reps: Option<String>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 60))]
    pub load: Option<String>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// A validated routine with format rules applied.
struct CheckedRoutine {
    name: String,
    format: WorkoutFormat,
    time_cap_minutes: Option<i32>,
    rounds: Option<i32>,
    description: Option<String>,
}

impl RoutineInput {
    fn checked(self) -> Result<CheckedRoutine, AppError> {
        let name = self.name.trim().to_string();
        let input = RoutineInput { name, ..self };
        input.validate()?;

        let (time_cap_minutes, rounds) = input.format.normalize(input.time_cap_minutes, input.rounds)?;

        Ok(CheckedRoutine {
            name: input.name,
            format: input.format,
            time_cap_minutes,
            rounds,
            description: clean_optional(input.description),
        })
    }
}

/// Service for a coach's reusable routine blocks.
pub struct RoutineBlockService<R: RoutineBlockRepository> {
    repository: Arc<R>,
}

impl<R: RoutineBlockRepository> RoutineBlockService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Creates a routine block owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when the format's rules are not met
    /// (for example an AMRAP without a time cap).
    pub async fn create(&self, actor: &Profile, input: RoutineInput) -> Result<RoutineBlock, AppError> {
        require_author(actor)?;
        let routine = input.checked()?;

        self.repository
            .create(NewRoutineBlock {
                coach_id: actor.id,
                name: routine.name,
                format: routine.format,
                time_cap_minutes: routine.time_cap_minutes,
                rounds: routine.rounds,
                description: routine.description,
            })
            .await
    }

    /// The actor's own routine blocks.
    pub async fn list(&self, actor: &Profile) -> Result<Vec<RoutineBlock>, AppError> {
        require_author(actor)?;
        self.repository.list_by_coach(&actor.id).await
    }

    /// Routine blocks a program's sections may embed.
    pub async fn list_for_coach(&self, coach_id: &Uuid) -> Result<Vec<RoutineBlock>, AppError> {
        self.repository.list_by_coach(coach_id).await
    }

    pub async fn detail(&self, actor: &Profile, id: i64) -> Result<RoutineBlockDetail, AppError> {
        let block = self.find_managed(actor, id).await?;
        let exercises = self.repository.list_exercises(&[id]).await?;
        Ok(RoutineBlockDetail { block, exercises })
    }

    pub async fn update(
        &self,
        actor: &Profile,
        id: i64,
        input: RoutineInput,
    ) -> Result<RoutineBlock, AppError> {
        self.find_managed(actor, id).await?;
        let routine = input.checked()?;

        self.repository
            .update(
                id,
                RoutineBlockUpdate {
                    name: routine.name,
                    format: routine.format,
                    time_cap_minutes: routine.time_cap_minutes,
                    rounds: routine.rounds,
                    description: routine.description,
                },
            )
            .await
    }

    /// Deletes a block. Sections that embedded it keep their text.
    pub async fn delete(&self, actor: &Profile, id: i64) -> Result<(), AppError> {
        self.find_managed(actor, id).await?;
        if !self.repository.delete(id).await? {
            return Err(routine_not_found(id));
        }
        Ok(())
    }

    pub async fn add_exercise(
        &self,
        actor: &Profile,
        block_id: i64,
        input: ExerciseInput,
    ) -> Result<Exercise, AppError> {
        self.find_managed(actor, block_id).await?;

        let name = input.name.trim().to_string();
        let input = ExerciseInput { name, ..input };
        input.validate()?;

        self.repository
            .add_exercise(NewExercise {
                routine_block_id: block_id,
                name: input.name,
                reps: clean_optional(input.reps),
                load: clean_optional(input.load),
                notes: clean_optional(input.notes),
            })
            .await
    }

    pub async fn remove_exercise(
        &self,
        actor: &Profile,
        block_id: i64,
        exercise_id: i64,
    ) -> Result<(), AppError> {
        self.find_managed(actor, block_id).await?;
        if !self.repository.remove_exercise(block_id, exercise_id).await? {
            return Err(AppError::not_found(
                "Exercise not found",
                json!({ "routine_block_id": block_id, "exercise_id": exercise_id }),
            ));
        }
        Ok(())
    }

    async fn find_managed(&self, actor: &Profile, id: i64) -> Result<RoutineBlock, AppError> {
        let block = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| routine_not_found(id))?;
        require_manager(actor, &block.coach_id)?;
        Ok(block)
    }
}

fn routine_not_found(id: i64) -> AppError {
    AppError::not_found("Routine not found", json!({ "routine_block_id": id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::{profile, routine_block};
    use crate::domain::entities::{Role, TABATA_DEFAULT_ROUNDS};
    use crate::domain::repositories::MockRoutineBlockRepository;

    fn input(format: WorkoutFormat, time_cap: Option<i32>, rounds: Option<i32>) -> RoutineInput {
        RoutineInput {
            name: " Fran ".to_string(),
            format,
            time_cap_minutes: time_cap,
            rounds,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_applies_tabata_default() {
        let coach = profile(Role::Coach);

        let mut repo = MockRoutineBlockRepository::new();
        repo.expect_create()
            .withf(|b| b.name == "Fran" && b.rounds == Some(TABATA_DEFAULT_ROUNDS))
            .times(1)
            .returning(|_| Ok(routine_block(WorkoutFormat::Tabata, None, Some(8))));

        RoutineBlockService::new(Arc::new(repo))
            .create(&coach, input(WorkoutFormat::Tabata, None, None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_amrap_without_cap_fails() {
        let coach = profile(Role::Coach);
        let mut repo = MockRoutineBlockRepository::new();
        repo.expect_create().times(0);

        let result = RoutineBlockService::new(Arc::new(repo))
            .create(&coach, input(WorkoutFormat::Amrap, None, None))
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_member_cannot_list_routines() {
        let result = RoutineBlockService::new(Arc::new(MockRoutineBlockRepository::new()))
            .list(&profile(Role::Member))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_update_other_coaches_block_is_forbidden() {
        let coach = profile(Role::Coach);

        let mut repo = MockRoutineBlockRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Ok(Some(routine_block(WorkoutFormat::ForTime, None, None))));
        repo.expect_update().times(0);

        let result = RoutineBlockService::new(Arc::new(repo))
            .update(&coach, 1, input(WorkoutFormat::ForTime, None, None))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_add_exercise_cleans_fields() {
        let coach = profile(Role::Coach);
        let coach_id = coach.id;

        let mut repo = MockRoutineBlockRepository::new();
        repo.expect_find_by_id().returning(move |_| {
            let mut block = routine_block(WorkoutFormat::ForTime, None, None);
            block.coach_id = coach_id;
            Ok(Some(block))
        });
        repo.expect_add_exercise()
            .withf(|e| e.name == "Thruster" && e.reps.as_deref() == Some("21") && e.load.is_none())
            .times(1)
            .returning(|e| {
                Ok(Exercise {
                    id: 1,
                    routine_block_id: e.routine_block_id,
                    position: 1,
                    name: e.name,
                    reps: e.reps,
                    load: e.load,
                    notes: e.notes,
                })
            });

        let exercise = RoutineBlockService::new(Arc::new(repo))
            .add_exercise(
                &coach,
                1,
                ExerciseInput {
                    name: " Thruster".to_string(),
                    reps: Some("21 ".to_string()),
                    load: Some(" ".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(exercise.prescription(), "21 × Thruster");
    }

    #[tokio::test]
    async fn test_remove_missing_exercise_is_not_found() {
        let coach = profile(Role::Admin);

        let mut repo = MockRoutineBlockRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Ok(Some(routine_block(WorkoutFormat::ForTime, None, None))));
        repo.expect_remove_exercise().returning(|_, _| Ok(false));

        let result = RoutineBlockService::new(Arc::new(repo))
            .remove_exercise(&coach, 1, 99)
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
