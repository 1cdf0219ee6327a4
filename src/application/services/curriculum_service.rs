//! Curriculum editing: blueprint days and their ordered sections.

use serde::Deserialize;
use serde_json::json;
use serde_with::{DisplayFromStr, NoneAsEmptyString, serde_as};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::application::services::authorization::{clean_optional, require_manager};
use crate::domain::entities::{
    Blueprint, BlueprintDetail, BlueprintPatch, Exercise, MoveDirection, NewBlueprint, NewSection,
    Profile, Program, RoutineBlock, RoutineBlockDetail, Section, SectionDetail, SectionKind,
    SectionPatch,
};
use crate::domain::repositories::{CurriculumRepository, ProgramRepository, RoutineBlockRepository};
use crate::error::AppError;

/// Longest plan accepted, in days.
pub const MAX_DAY_NUMBER: i32 = 730;

#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DayInput {
    /// Empty means "after the last day".
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(range(min = 1, max = MAX_DAY_NUMBER, message = "Day must be between 1 and 730"))]
    pub day_number: Option<i32>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 120, message = "Title must be at most 120 characters"))]
    pub title: Option<String>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub notes: Option<String>,

    #[serde(default)]
    pub is_rest_day: bool,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SectionInput {
    #[serde_as(as = "DisplayFromStr")]
    pub kind: SectionKind,

    #[validate(length(min = 1, max = 120, message = "Title must be 1 to 120 characters"))]
    pub title: String,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub body: Option<String>,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub routine_block_id: Option<i64>,
}

impl SectionInput {
    fn normalized(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.body = clean_optional(self.body);
        self.validate()?;
        Ok(self)
    }
}

/// Service for the day-by-day plan of a program.
pub struct CurriculumService<P, C, R>
where
    P: ProgramRepository,
    C: CurriculumRepository,
    R: RoutineBlockRepository,
{
    programs: Arc<P>,
    curriculum: Arc<C>,
    routines: Arc<R>,
}

impl<P, C, R> CurriculumService<P, C, R>
where
    P: ProgramRepository,
    C: CurriculumRepository,
    R: RoutineBlockRepository,
{
    pub fn new(programs: Arc<P>, curriculum: Arc<C>, routines: Arc<R>) -> Self {
        Self {
            programs,
            curriculum,
            routines,
        }
    }

    /// The program and its days, for the curriculum editor.
    pub async fn plan(
        &self,
        actor: &Profile,
        program_id: i64,
    ) -> Result<(Program, Vec<Blueprint>), AppError> {
        let program = self.managed_program(actor, program_id).await?;
        let days = self.curriculum.list_days(program_id).await?;
        Ok((program, days))
    }

    /// Days of a program in order. Callers check access.
    pub async fn days(&self, program_id: i64) -> Result<Vec<Blueprint>, AppError> {
        self.curriculum.list_days(program_id).await
    }

    /// Adds a day, defaulting to the one after the current last day.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the day number is already taken.
    pub async fn add_day(
        &self,
        actor: &Profile,
        program_id: i64,
        input: DayInput,
    ) -> Result<Blueprint, AppError> {
        self.managed_program(actor, program_id).await?;
        input.validate()?;

        let day_number = match input.day_number {
            Some(day) => day,
            None => self
                .curriculum
                .last_day_number(program_id)
                .await?
                .map_or(1, |last| last + 1),
        };
        if day_number > MAX_DAY_NUMBER {
            return Err(AppError::bad_request(
                "Plans are limited to two years",
                json!({ "day_number": day_number, "max": MAX_DAY_NUMBER }),
            ));
        }
        self.ensure_day_free(program_id, day_number).await?;

        let title = clean_optional(input.title).unwrap_or_else(|| format!("Day {}", day_number));
        let day = self
            .curriculum
            .create_day(NewBlueprint {
                program_id,
                day_number,
                title,
                notes: clean_optional(input.notes),
                is_rest_day: input.is_rest_day,
            })
            .await?;

        tracing::info!(program_id, day_number, "Day added");
        Ok(day)
    }

    /// Updates title, notes and the rest-day flag. The day number is fixed.
    pub async fn update_day(
        &self,
        actor: &Profile,
        blueprint_id: i64,
        input: DayInput,
    ) -> Result<Blueprint, AppError> {
        let (_, day) = self.managed_day(actor, blueprint_id).await?;
        input.validate()?;

        let title = clean_optional(input.title).unwrap_or_else(|| format!("Day {}", day.day_number));
        self.curriculum
            .update_day(
                blueprint_id,
                BlueprintPatch {
                    title: Some(title),
                    notes: Some(clean_optional(input.notes)),
                    is_rest_day: Some(input.is_rest_day),
                },
            )
            .await
    }

    /// Deletes a day with its sections and members' progress on it.
    pub async fn delete_day(&self, actor: &Profile, blueprint_id: i64) -> Result<Blueprint, AppError> {
        let (_, day) = self.managed_day(actor, blueprint_id).await?;
        if !self.curriculum.delete_day(blueprint_id).await? {
            return Err(day_not_found(blueprint_id));
        }
        tracing::info!(program_id = day.program_id, day_number = day.day_number, "Day deleted");
        Ok(day)
    }

    /// Copies a day and all its sections to an unused day number.
    pub async fn copy_day(
        &self,
        actor: &Profile,
        blueprint_id: i64,
        target_day: i32,
    ) -> Result<Blueprint, AppError> {
        let (_, day) = self.managed_day(actor, blueprint_id).await?;

        if !(1..=MAX_DAY_NUMBER).contains(&target_day) {
            return Err(AppError::bad_request(
                format!("Day must be between 1 and {}", MAX_DAY_NUMBER),
                json!({ "day_number": target_day }),
            ));
        }
        self.ensure_day_free(day.program_id, target_day).await?;

        self.curriculum.copy_day(blueprint_id, target_day).await
    }

    /// Appends a section to a day.
    pub async fn add_section(
        &self,
        actor: &Profile,
        blueprint_id: i64,
        input: SectionInput,
    ) -> Result<Section, AppError> {
        let (program, _) = self.managed_day(actor, blueprint_id).await?;
        let input = input.normalized()?;
        self.check_routine(&program, input.routine_block_id).await?;

        self.curriculum
            .add_section(NewSection {
                blueprint_id,
                kind: input.kind,
                title: input.title,
                body: input.body,
                routine_block_id: input.routine_block_id,
            })
            .await
    }

    pub async fn update_section(
        &self,
        actor: &Profile,
        section_id: i64,
        input: SectionInput,
    ) -> Result<Section, AppError> {
        let (program, _) = self.managed_section(actor, section_id).await?;
        let input = input.normalized()?;
        self.check_routine(&program, input.routine_block_id).await?;

        self.curriculum
            .update_section(
                section_id,
                SectionPatch {
                    kind: Some(input.kind),
                    title: Some(input.title),
                    body: Some(input.body),
                    routine_block_id: Some(input.routine_block_id),
                },
            )
            .await
    }

    /// Deletes a section; later sections move up one position.
    pub async fn delete_section(&self, actor: &Profile, section_id: i64) -> Result<Section, AppError> {
        let (_, section) = self.managed_section(actor, section_id).await?;
        if !self.curriculum.delete_section(section_id).await? {
            return Err(section_not_found(section_id));
        }
        Ok(section)
    }

    /// Swaps a section with its neighbour. Moving past either end is a no-op.
    pub async fn move_section(
        &self,
        actor: &Profile,
        section_id: i64,
        direction: MoveDirection,
    ) -> Result<Section, AppError> {
        let (_, section) = self.managed_section(actor, section_id).await?;
        let moved = self.curriculum.move_section(section_id, direction).await?;
        tracing::debug!(section_id, moved, "Section move");
        Ok(section)
    }

    /// A day with sections and embedded routines, for the editor.
    pub async fn editor(
        &self,
        actor: &Profile,
        blueprint_id: i64,
    ) -> Result<(Program, BlueprintDetail), AppError> {
        let (program, day) = self.managed_day(actor, blueprint_id).await?;
        let detail = self.blueprint_detail(day).await?;
        Ok((program, detail))
    }

    /// A day of a program by number. Callers check access.
    pub async fn day_detail(
        &self,
        program_id: i64,
        day_number: i32,
    ) -> Result<BlueprintDetail, AppError> {
        let day = self
            .curriculum
            .find_day_by_number(program_id, day_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Day not found",
                    json!({ "program_id": program_id, "day_number": day_number }),
                )
            })?;
        self.blueprint_detail(day).await
    }

    /// Loads sections of a day together with their routine blocks and exercises.
    pub async fn blueprint_detail(&self, blueprint: Blueprint) -> Result<BlueprintDetail, AppError> {
        let sections = self.curriculum.list_sections(blueprint.id).await?;

        let mut block_ids: Vec<i64> = sections.iter().filter_map(|s| s.routine_block_id).collect();
        block_ids.sort_unstable();
        block_ids.dedup();

        let (blocks, exercises) = if block_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            tokio::try_join!(
                self.routines.find_many(&block_ids),
                self.routines.list_exercises(&block_ids)
            )?
        };

        Ok(BlueprintDetail {
            blueprint,
            sections: assemble_sections(sections, blocks, exercises),
        })
    }

    async fn managed_program(&self, actor: &Profile, program_id: i64) -> Result<Program, AppError> {
        let program = self.programs.find_by_id(program_id).await?.ok_or_else(|| {
            AppError::not_found("Program not found", json!({ "program_id": program_id }))
        })?;
        require_manager(actor, &program.coach_id)?;
        Ok(program)
    }

    async fn managed_day(
        &self,
        actor: &Profile,
        blueprint_id: i64,
    ) -> Result<(Program, Blueprint), AppError> {
        let day = self
            .curriculum
            .find_day(blueprint_id)
            .await?
            .ok_or_else(|| day_not_found(blueprint_id))?;
        let program = self.managed_program(actor, day.program_id).await?;
        Ok((program, day))
    }

    async fn managed_section(
        &self,
        actor: &Profile,
        section_id: i64,
    ) -> Result<(Program, Section), AppError> {
        let section = self
            .curriculum
            .find_section(section_id)
            .await?
            .ok_or_else(|| section_not_found(section_id))?;
        let (program, _) = self.managed_day(actor, section.blueprint_id).await?;
        Ok((program, section))
    }

    async fn ensure_day_free(&self, program_id: i64, day_number: i32) -> Result<(), AppError> {
        if self
            .curriculum
            .find_day_by_number(program_id, day_number)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "That day already exists",
                json!({ "program_id": program_id, "day_number": day_number }),
            ));
        }
        Ok(())
    }

    /// A section may only embed routines of the program's coach.
    async fn check_routine(
        &self,
        program: &Program,
        routine_block_id: Option<i64>,
    ) -> Result<(), AppError> {
        let Some(block_id) = routine_block_id else {
            return Ok(());
        };

        match self.routines.find_by_id(block_id).await? {
            Some(block) if block.coach_id == program.coach_id => Ok(()),
            Some(_) => Err(AppError::forbidden(
                "Routine belongs to another coach",
                json!({ "routine_block_id": block_id }),
            )),
            None => Err(AppError::bad_request(
                "Routine not found",
                json!({ "routine_block_id": block_id }),
            )),
        }
    }
}

fn day_not_found(blueprint_id: i64) -> AppError {
    AppError::not_found("Day not found", json!({ "blueprint_id": blueprint_id }))
}

fn section_not_found(section_id: i64) -> AppError {
    AppError::not_found("Section not found", json!({ "section_id": section_id }))
}

fn assemble_sections(
    sections: Vec<Section>,
    blocks: Vec<RoutineBlock>,
    exercises: Vec<Exercise>,
) -> Vec<SectionDetail> {
    let mut by_block: HashMap<i64, Vec<Exercise>> = HashMap::new();
    for exercise in exercises {
        by_block
            .entry(exercise.routine_block_id)
            .or_default()
            .push(exercise);
    }
    for list in by_block.values_mut() {
        list.sort_by_key(|e| e.position);
    }

    let blocks: HashMap<i64, RoutineBlock> = blocks.into_iter().map(|b| (b.id, b)).collect();

    sections
        .into_iter()
        .map(|section| {
            let routine = section.routine_block_id.and_then(|id| {
                blocks.get(&id).map(|block| RoutineBlockDetail {
                    block: block.clone(),
                    exercises: by_block.get(&id).cloned().unwrap_or_default(),
                })
            });
            SectionDetail { section, routine }
        })
        .collect()
}
