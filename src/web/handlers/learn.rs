//! Training pages for enrolled members, with preview for owners.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, State};
use axum::response::{IntoResponse, Redirect, Response};

use crate::application::services::{Access, ProgramProgress, ProgressInput};
use crate::domain::entities::{BlueprintDetail, Profile, Program, SectionDetail};
use crate::state::AppState;
use crate::web::error::WebError;
use crate::web::middleware::web_auth::CurrentUser;
use crate::web::views::{Nav, access_until, format_datetime};

pub struct DayCard {
    day_number: i32,
    label: String,
    title: String,
    is_rest_day: bool,
    completed: bool,
    is_next: bool,
}

pub struct WeekView {
    number: i32,
    days: Vec<DayCard>,
}

fn weeks(progress: &ProgramProgress) -> Vec<WeekView> {
    let mut weeks: Vec<WeekView> = Vec::new();
    for day in &progress.days {
        let card = DayCard {
            day_number: day.day_number,
            label: day.label(),
            title: day.title.clone(),
            is_rest_day: day.is_rest_day,
            completed: progress.is_completed(day.day_number),
            is_next: progress.summary.next_day == Some(day.day_number),
        };
        match weeks.last_mut() {
            Some(week) if week.number == day.week_number() => week.days.push(card),
            _ => weeks.push(WeekView {
                number: day.week_number(),
                days: vec![card],
            }),
        }
    }
    weeks
}

/// Loads a program the user may train with, or sends them to its sales page.
async fn learnable(
    st: &AppState,
    user: &Profile,
    slug: &str,
) -> Result<Result<(Program, Access), Response>, WebError> {
    let program = st.program_service.get_by_slug(slug).await?;
    let access = st.enrollment_service.access(Some(user), &program).await?;
    if !access.can_learn() {
        return Ok(Err(
            Redirect::to(&format!("/programs/{}", program.slug)).into_response()
        ));
    }
    Ok(Ok((program, access)))
}

#[derive(Template, WebTemplate)]
#[template(path = "learn/plan.html")]
pub struct PlanTemplate {
    nav: Nav,
    program: Program,
    weeks: Vec<WeekView>,
    completed_days: i64,
    total_days: i64,
    percent: i64,
    next_day: Option<i32>,
    access_note: String,
    preview: bool,
}

/// Renders the program's plan grouped by week, with completion marks.
///
/// # Endpoint
///
/// `GET /learn/{slug}`
pub async fn plan_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let (program, access) = match learnable(&st, &user, &slug).await? {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };

    let progress = st
        .progress_service
        .progress(program.id, access.enrollment())
        .await?;

    let access_note = match access.enrollment() {
        Some(enrollment) => format!("Access {}", access_until(enrollment.expires_at)),
        None => "Preview as the program's coach. Progress is not recorded.".to_string(),
    };

    Ok(PlanTemplate {
        nav: Nav::for_viewer(Some(&user)),
        weeks: weeks(&progress),
        completed_days: progress.summary.completed_days,
        total_days: progress.summary.total_days,
        percent: progress.summary.percent,
        next_day: progress.summary.next_day,
        preview: access.enrollment().is_none(),
        access_note,
        program,
    }
    .into_response())
}

pub struct ExerciseLine {
    name: String,
    prescription: String,
    notes: Option<String>,
}

pub struct RoutineView {
    name: String,
    format_label: String,
    description: Option<String>,
    exercises: Vec<ExerciseLine>,
}

pub struct SectionView {
    kind_label: &'static str,
    title: String,
    body: Option<String>,
    routine: Option<RoutineView>,
}

impl From<SectionDetail> for SectionView {
    fn from(detail: SectionDetail) -> Self {
        let routine = detail.routine.map(|routine| RoutineView {
            name: routine.block.name.clone(),
            format_label: routine.block.format_label(),
            description: routine.block.description.clone(),
            exercises: routine
                .exercises
                .iter()
                .map(|exercise| ExerciseLine {
                    name: exercise.name.clone(),
                    prescription: exercise.prescription(),
                    notes: exercise.notes.clone(),
                })
                .collect(),
        });

        Self {
            kind_label: detail.section.kind.label(),
            title: detail.section.title,
            body: detail.section.body,
            routine,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "learn/day.html")]
pub struct DayTemplate {
    nav: Nav,
    program: Program,
    day_number: i32,
    label: String,
    title: String,
    notes: Option<String>,
    is_rest_day: bool,
    sections: Vec<SectionView>,
    can_track: bool,
    completed: bool,
    completed_at: Option<String>,
    result: String,
    note: String,
    prev_day: Option<i32>,
    next_day: Option<i32>,
}

/// Renders one day of the plan with its sections and routines.
///
/// # Endpoint
///
/// `GET /learn/{slug}/days/{day}`
pub async fn day_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((slug, day_number)): Path<(String, i32)>,
) -> Result<Response, WebError> {
    let (program, access) = match learnable(&st, &user, &slug).await? {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };

    let BlueprintDetail { blueprint, sections } = st
        .curriculum_service
        .day_detail(program.id, day_number)
        .await?;
    let progress = st
        .progress_service
        .progress(program.id, access.enrollment())
        .await?;

    let position = progress
        .days
        .iter()
        .position(|d| d.day_number == blueprint.day_number);
    let prev_day = position
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| progress.days.get(i))
        .map(|d| d.day_number);
    let next_day = position
        .and_then(|i| progress.days.get(i + 1))
        .map(|d| d.day_number);

    let entry = progress.entry_for(blueprint.day_number);

    Ok(DayTemplate {
        nav: Nav::for_viewer(Some(&user)),
        day_number: blueprint.day_number,
        label: blueprint.label(),
        title: blueprint.title.clone(),
        notes: blueprint.notes.clone(),
        is_rest_day: blueprint.is_rest_day,
        sections: sections.into_iter().map(SectionView::from).collect(),
        can_track: access.enrollment().is_some(),
        completed: entry.is_some(),
        completed_at: entry.map(|e| format_datetime(e.completed_at)),
        result: entry.and_then(|e| e.result.clone()).unwrap_or_default(),
        note: entry.and_then(|e| e.note.clone()).unwrap_or_default(),
        prev_day,
        next_day,
        program,
    }
    .into_response())
}

/// Marks a day complete, optionally with a result and a note.
///
/// Submitting again replaces the recorded result.
///
/// # Endpoint
///
/// `POST /learn/{slug}/days/{day}/complete`
pub async fn complete_day_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((slug, day_number)): Path<(String, i32)>,
    Form(input): Form<ProgressInput>,
) -> Result<Redirect, WebError> {
    let program = st.program_service.get_by_slug(&slug).await?;
    st.progress_service
        .complete_day(&user, &program, day_number, input)
        .await?;

    Ok(Redirect::to(&format!("/learn/{}/days/{}", slug, day_number)))
}

/// Clears a day's completion.
///
/// # Endpoint
///
/// `POST /learn/{slug}/days/{day}/reset`
pub async fn reset_day_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((slug, day_number)): Path<(String, i32)>,
) -> Result<Redirect, WebError> {
    let program = st.program_service.get_by_slug(&slug).await?;
    st.progress_service
        .reset_day(&user, &program, day_number)
        .await?;

    Ok(Redirect::to(&format!("/learn/{}/days/{}", slug, day_number)))
}
