//! Coach area: curriculum editor for days and their sections.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, State};
use axum::response::Redirect;
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::application::services::{DayInput, SectionInput};
use crate::domain::entities::{
    Blueprint, BlueprintDetail, MoveDirection, Program, RoutineBlock, SectionDetail, SectionKind,
};
use crate::state::AppState;
use crate::web::error::WebError;
use crate::web::middleware::web_auth::CoachUser;
use crate::web::views::{Nav, SelectOption};

pub struct DayRow {
    id: i64,
    label: String,
    title: String,
    is_rest_day: bool,
}

impl From<&Blueprint> for DayRow {
    fn from(day: &Blueprint) -> Self {
        Self {
            id: day.id,
            label: day.label(),
            title: day.title.clone(),
            is_rest_day: day.is_rest_day,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/curriculum.html")]
pub struct CurriculumTemplate {
    nav: Nav,
    program: Program,
    days: Vec<DayRow>,
    next_day_number: i32,
}

/// Lists the program's days and offers a form to add one.
///
/// # Endpoint
///
/// `GET /coach/programs/{id}/curriculum`
pub async fn curriculum_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(program_id): Path<i64>,
) -> Result<CurriculumTemplate, WebError> {
    let (program, days) = st.curriculum_service.plan(&coach, program_id).await?;

    Ok(CurriculumTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        next_day_number: days.last().map_or(1, |d| d.day_number + 1),
        days: days.iter().map(DayRow::from).collect(),
        program,
    })
}

/// `POST /coach/programs/{id}/days`
pub async fn add_day_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(program_id): Path<i64>,
    Form(input): Form<DayInput>,
) -> Result<Redirect, WebError> {
    let day = st
        .curriculum_service
        .add_day(&coach, program_id, input)
        .await?;
    Ok(Redirect::to(&format!("/coach/days/{}", day.id)))
}

pub struct SectionEditView {
    id: i64,
    kind_label: &'static str,
    title: String,
    body: String,
    routine_name: Option<String>,
    is_first: bool,
    is_last: bool,
    kind_options: Vec<SelectOption>,
    routine_options: Vec<SelectOption>,
}

fn kind_options(selected: Option<SectionKind>) -> Vec<SelectOption> {
    SectionKind::ALL
        .iter()
        .map(|kind| SelectOption::new(kind.as_str(), kind.label(), selected == Some(*kind)))
        .collect()
}

fn routine_options(routines: &[RoutineBlock], selected: Option<i64>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "No routine", selected.is_none()))
        .chain(routines.iter().map(|routine| {
            SelectOption::new(
                routine.id,
                format!("{} ({})", routine.name, routine.format_label()),
                selected == Some(routine.id),
            )
        }))
        .collect()
}

fn section_views(sections: Vec<SectionDetail>, routines: &[RoutineBlock]) -> Vec<SectionEditView> {
    let count = sections.len();
    sections
        .into_iter()
        .enumerate()
        .map(|(i, detail)| {
            let section = detail.section;
            SectionEditView {
                id: section.id,
                kind_label: section.kind.label(),
                title: section.title,
                body: section.body.unwrap_or_default(),
                routine_name: detail.routine.map(|r| r.block.name),
                is_first: i == 0,
                is_last: i + 1 == count,
                kind_options: kind_options(Some(section.kind)),
                routine_options: routine_options(routines, section.routine_block_id),
            }
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/day.html")]
pub struct DayEditorTemplate {
    nav: Nav,
    program: Program,
    day_id: i64,
    day_label: String,
    title: String,
    notes: String,
    is_rest_day: bool,
    sections: Vec<SectionEditView>,
    kind_options: Vec<SelectOption>,
    routine_options: Vec<SelectOption>,
}

/// Renders the editor for one day with its sections.
///
/// Routine blocks offered for embedding are the program coach's own.
///
/// # Endpoint
///
/// `GET /coach/days/{id}`
pub async fn day_editor_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(blueprint_id): Path<i64>,
) -> Result<DayEditorTemplate, WebError> {
    let (program, BlueprintDetail { blueprint, sections }) =
        st.curriculum_service.editor(&coach, blueprint_id).await?;
    let routines = st
        .routine_service
        .list_for_coach(&program.coach_id)
        .await?;

    Ok(DayEditorTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        day_id: blueprint.id,
        day_label: blueprint.label(),
        title: blueprint.title,
        notes: blueprint.notes.unwrap_or_default(),
        is_rest_day: blueprint.is_rest_day,
        sections: section_views(sections, &routines),
        kind_options: kind_options(None),
        routine_options: routine_options(&routines, None),
        program,
    })
}

fn back_to_day(blueprint_id: i64) -> Redirect {
    Redirect::to(&format!("/coach/days/{}", blueprint_id))
}

/// `POST /coach/days/{id}`
pub async fn update_day_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(blueprint_id): Path<i64>,
    Form(input): Form<DayInput>,
) -> Result<Redirect, WebError> {
    st.curriculum_service
        .update_day(&coach, blueprint_id, input)
        .await?;
    Ok(back_to_day(blueprint_id))
}

/// Deletes a day and returns to the curriculum.
///
/// # Endpoint
///
/// `POST /coach/days/{id}/delete`
pub async fn delete_day_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(blueprint_id): Path<i64>,
) -> Result<Redirect, WebError> {
    let day = st
        .curriculum_service
        .delete_day(&coach, blueprint_id)
        .await?;
    Ok(Redirect::to(&format!(
        "/coach/programs/{}/curriculum",
        day.program_id
    )))
}

#[derive(Debug, Deserialize)]
pub struct CopyDayForm {
    target_day: i32,
}

/// Copies a day with all its sections and opens the copy.
///
/// # Endpoint
///
/// `POST /coach/days/{id}/copy`
pub async fn copy_day_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(blueprint_id): Path<i64>,
    Form(form): Form<CopyDayForm>,
) -> Result<Redirect, WebError> {
    let copy = st
        .curriculum_service
        .copy_day(&coach, blueprint_id, form.target_day)
        .await?;
    Ok(back_to_day(copy.id))
}

/// `POST /coach/days/{id}/sections`
pub async fn add_section_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(blueprint_id): Path<i64>,
    Form(input): Form<SectionInput>,
) -> Result<Redirect, WebError> {
    st.curriculum_service
        .add_section(&coach, blueprint_id, input)
        .await?;
    Ok(back_to_day(blueprint_id))
}

/// `POST /coach/sections/{id}`
pub async fn update_section_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(section_id): Path<i64>,
    Form(input): Form<SectionInput>,
) -> Result<Redirect, WebError> {
    let section = st
        .curriculum_service
        .update_section(&coach, section_id, input)
        .await?;
    Ok(back_to_day(section.blueprint_id))
}

/// `POST /coach/sections/{id}/delete`
pub async fn delete_section_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(section_id): Path<i64>,
) -> Result<Redirect, WebError> {
    let section = st
        .curriculum_service
        .delete_section(&coach, section_id)
        .await?;
    Ok(back_to_day(section.blueprint_id))
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct MoveSectionForm {
    #[serde_as(as = "DisplayFromStr")]
    direction: MoveDirection,
}

/// Swaps a section with its neighbour. Moving past either end is a no-op.
///
/// # Endpoint
///
/// `POST /coach/sections/{id}/move`
pub async fn move_section_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(section_id): Path<i64>,
    Form(form): Form<MoveSectionForm>,
) -> Result<Redirect, WebError> {
    let section = st
        .curriculum_service
        .move_section(&coach, section_id, form.direction)
        .await?;
    Ok(back_to_day(section.blueprint_id))
}
