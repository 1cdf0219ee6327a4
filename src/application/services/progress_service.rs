//! Day completion tracking for enrolled members.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use serde_with::{NoneAsEmptyString, serde_as};
use std::sync::Arc;
use validator::Validate;

use crate::application::services::authorization::clean_optional;
use crate::domain::entities::{
    Blueprint, Enrollment, NewProgressEntry, Profile, Program, ProgressEntry, ProgressSummary,
};
use crate::domain::repositories::{CurriculumRepository, EnrollmentRepository, ProgressRepository};
use crate::error::AppError;

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProgressInput {
    /// Free-form score, e.g. `12:34` or `5 rounds + 3`.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 120))]
    pub result: Option<String>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// A program's plan together with one enrollment's completion records.
#[derive(Debug, Clone)]
pub struct ProgramProgress {
    pub days: Vec<Blueprint>,
    pub entries: Vec<ProgressEntry>,
    pub summary: ProgressSummary,
}

impl ProgramProgress {
    pub fn entry_for(&self, day_number: i32) -> Option<&ProgressEntry> {
        self.entries.iter().find(|e| e.day_number == day_number)
    }

    pub fn is_completed(&self, day_number: i32) -> bool {
        self.entry_for(day_number).is_some()
    }
}

pub struct ProgressService<E, C, G>
where
    E: EnrollmentRepository,
    C: CurriculumRepository,
    G: ProgressRepository,
{
    enrollments: Arc<E>,
    curriculum: Arc<C>,
    progress: Arc<G>,
}

impl<E, C, G> ProgressService<E, C, G>
where
    E: EnrollmentRepository,
    C: CurriculumRepository,
    G: ProgressRepository,
{
    pub fn new(enrollments: Arc<E>, curriculum: Arc<C>, progress: Arc<G>) -> Self {
        Self {
            enrollments,
            curriculum,
            progress,
        }
    }

    /// Marks a day completed. Completing it again refreshes the timestamp,
    /// result and note.
    ///
    /// # Errors
    ///
    /// - [`AppError::Forbidden`] without an active enrollment
    /// - [`AppError::NotFound`] if the day is not in the plan
    pub async fn complete_day(
        &self,
        user: &Profile,
        program: &Program,
        day_number: i32,
        input: ProgressInput,
    ) -> Result<ProgressEntry, AppError> {
        input.validate()?;
        let enrollment = self.active_enrollment(user, program).await?;
        let day = self.find_day(program.id, day_number).await?;

        let entry = self
            .progress
            .upsert(NewProgressEntry {
                enrollment_id: enrollment.id,
                blueprint_id: day.id,
                result: clean_optional(input.result),
                note: clean_optional(input.note),
            })
            .await?;

        tracing::debug!(
            enrollment_id = enrollment.id,
            program_id = program.id,
            day_number,
            "Day completed"
        );
        Ok(entry)
    }

    /// Clears a day's completion. Clearing a day that was not completed is a no-op.
    pub async fn reset_day(
        &self,
        user: &Profile,
        program: &Program,
        day_number: i32,
    ) -> Result<(), AppError> {
        let enrollment = self.active_enrollment(user, program).await?;
        let day = self.find_day(program.id, day_number).await?;

        self.progress.delete(enrollment.id, day.id).await?;
        Ok(())
    }

    /// The plan with completion state. Without an enrollment (owners and
    /// admins previewing) every day is uncompleted.
    pub async fn progress(
        &self,
        program_id: i64,
        enrollment: Option<&Enrollment>,
    ) -> Result<ProgramProgress, AppError> {
        let days = self.curriculum.list_days(program_id).await?;
        let entries = match enrollment {
            Some(enrollment) => self.progress.list(enrollment.id).await?,
            None => Vec::new(),
        };

        let plan_days: Vec<i32> = days.iter().map(|d| d.day_number).collect();
        let summary = ProgressSummary::from_entries(&plan_days, &entries);

        Ok(ProgramProgress {
            days,
            entries,
            summary,
        })
    }

    async fn active_enrollment(&self, user: &Profile, program: &Program) -> Result<Enrollment, AppError> {
        self.enrollments
            .find(&user.id, program.id)
            .await?
            .filter(|e| e.is_active_at(Utc::now()))
            .ok_or_else(|| {
                AppError::forbidden(
                    "An active enrollment is required to track progress",
                    json!({ "program_id": program.id }),
                )
            })
    }

    async fn find_day(&self, program_id: i64, day_number: i32) -> Result<Blueprint, AppError> {
        self.curriculum
            .find_day_by_number(program_id, day_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Day not found",
                    json!({ "program_id": program_id, "day_number": day_number }),
                )
            })
    }
}
