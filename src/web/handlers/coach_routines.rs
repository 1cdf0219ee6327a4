//! Coach area: reusable routine blocks and their exercises.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, State};
use axum::response::Redirect;

use crate::application::services::{ExerciseInput, RoutineInput};
use crate::domain::entities::{Exercise, RoutineBlock, RoutineBlockDetail, WorkoutFormat};
use crate::state::AppState;
use crate::web::error::WebError;
use crate::web::middleware::web_auth::CoachUser;
use crate::web::views::{Nav, SelectOption};

fn format_options(selected: Option<WorkoutFormat>) -> Vec<SelectOption> {
    WorkoutFormat::ALL
        .iter()
        .map(|format| {
            SelectOption::new(format.as_str(), format.label(), selected == Some(*format))
        })
        .collect()
}

pub struct RoutineRow {
    id: i64,
    name: String,
    format_label: String,
}

impl From<RoutineBlock> for RoutineRow {
    fn from(block: RoutineBlock) -> Self {
        Self {
            format_label: block.format_label(),
            id: block.id,
            name: block.name,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/routines.html")]
pub struct RoutinesTemplate {
    nav: Nav,
    routines: Vec<RoutineRow>,
    format_options: Vec<SelectOption>,
}

/// Lists the coach's routine blocks with a form to create one.
///
/// # Endpoint
///
/// `GET /coach/routines`
pub async fn routines_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
) -> Result<RoutinesTemplate, WebError> {
    let routines = st.routine_service.list(&coach).await?;

    Ok(RoutinesTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        routines: routines.into_iter().map(RoutineRow::from).collect(),
        format_options: format_options(None),
    })
}

/// `POST /coach/routines`
pub async fn create_routine_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Form(input): Form<RoutineInput>,
) -> Result<Redirect, WebError> {
    let block = st.routine_service.create(&coach, input).await?;
    Ok(Redirect::to(&format!("/coach/routines/{}", block.id)))
}

pub struct ExerciseRow {
    id: i64,
    name: String,
    prescription: String,
    notes: Option<String>,
}

impl From<Exercise> for ExerciseRow {
    fn from(exercise: Exercise) -> Self {
        Self {
            prescription: exercise.prescription(),
            id: exercise.id,
            name: exercise.name,
            notes: exercise.notes,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/routine.html")]
pub struct RoutineTemplate {
    nav: Nav,
    id: i64,
    name: String,
    format_label: String,
    time_cap_minutes: String,
    rounds: String,
    description: String,
    format_options: Vec<SelectOption>,
    exercises: Vec<ExerciseRow>,
}

/// Renders a routine block's editor and exercise list.
///
/// # Endpoint
///
/// `GET /coach/routines/{id}`
pub async fn routine_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<RoutineTemplate, WebError> {
    let RoutineBlockDetail { block, exercises } = st.routine_service.detail(&coach, id).await?;

    Ok(RoutineTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        id: block.id,
        format_label: block.format_label(),
        format_options: format_options(Some(block.format)),
        time_cap_minutes: block
            .time_cap_minutes
            .map(|m| m.to_string())
            .unwrap_or_default(),
        rounds: block.rounds.map(|r| r.to_string()).unwrap_or_default(),
        description: block.description.unwrap_or_default(),
        name: block.name,
        exercises: exercises.into_iter().map(ExerciseRow::from).collect(),
    })
}

fn back_to_routine(id: i64) -> Redirect {
    Redirect::to(&format!("/coach/routines/{}", id))
}

/// `POST /coach/routines/{id}`
pub async fn update_routine_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
    Form(input): Form<RoutineInput>,
) -> Result<Redirect, WebError> {
    st.routine_service.update(&coach, id, input).await?;
    Ok(back_to_routine(id))
}

/// Deletes a routine block. Sections embedding it keep their text.
///
/// # Endpoint
///
/// `POST /coach/routines/{id}/delete`
pub async fn delete_routine_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    st.routine_service.delete(&coach, id).await?;
    Ok(Redirect::to("/coach/routines"))
}

/// `POST /coach/routines/{id}/exercises`
pub async fn add_exercise_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
    Form(input): Form<ExerciseInput>,
) -> Result<Redirect, WebError> {
    st.routine_service.add_exercise(&coach, id, input).await?;
    Ok(back_to_routine(id))
}

/// `POST /coach/routines/{id}/exercises/{exercise_id}/delete`
pub async fn remove_exercise_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path((id, exercise_id)): Path<(i64, i64)>,
) -> Result<Redirect, WebError> {
    st.routine_service
        .remove_exercise(&coach, id, exercise_id)
        .await?;
    Ok(back_to_routine(id))
}
