//! Coach area: program overview, editor, publication and members.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

use crate::application::services::ProgramInput;
use crate::domain::entities::{
    MemberEnrollment, Profile, Program, ProgramOverview, ProgramStatus, completion_percent,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::web::error::{WebError, form_message};
use crate::web::middleware::web_auth::CoachUser;
use crate::web::views::{Nav, access_until, format_date, money};

pub struct OverviewRow {
    id: i64,
    slug: String,
    title: String,
    status: &'static str,
    price: String,
    active_members: i64,
    days: i64,
    revenue: String,
}

impl From<ProgramOverview> for OverviewRow {
    fn from(overview: ProgramOverview) -> Self {
        let program = overview.program;
        Self {
            revenue: money(overview.revenue, &program.currency),
            price: program.price_label(),
            status: program.status.as_str(),
            active_members: overview.active_members,
            days: overview.days,
            id: program.id,
            slug: program.slug,
            title: program.title,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/overview.html")]
pub struct CoachOverviewTemplate {
    nav: Nav,
    programs: Vec<OverviewRow>,
}

/// Renders the coach's programs with members, plan length and revenue.
///
/// # Endpoint
///
/// `GET /coach`
pub async fn coach_overview_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
) -> Result<CoachOverviewTemplate, WebError> {
    let programs = st.program_service.coach_overview(&coach).await?;

    Ok(CoachOverviewTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        programs: programs.into_iter().map(OverviewRow::from).collect(),
    })
}

/// Raw editor field values, kept as text so a rejected form can be shown again.
#[derive(Debug, Clone, Default)]
pub struct ProgramFormValues {
    title: String,
    summary: String,
    description: String,
    price: String,
    access_days: String,
}

impl From<&ProgramInput> for ProgramFormValues {
    fn from(input: &ProgramInput) -> Self {
        Self {
            title: input.title.clone(),
            summary: input.summary.clone().unwrap_or_default(),
            description: input.description.clone(),
            price: input.price.to_string(),
            access_days: input.access_days.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

impl From<&Program> for ProgramFormValues {
    fn from(program: &Program) -> Self {
        Self {
            title: program.title.clone(),
            summary: program.summary.clone().unwrap_or_default(),
            description: program.description.clone(),
            price: program.price.to_string(),
            access_days: program.access_days.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

/// State of an existing program shown next to its editor.
pub struct ProgramMeta {
    id: i64,
    slug: String,
    status: &'static str,
    is_draft: bool,
    is_published: bool,
    is_archived: bool,
    thumbnail_url: Option<String>,
}

impl From<&Program> for ProgramMeta {
    fn from(program: &Program) -> Self {
        Self {
            id: program.id,
            slug: program.slug.clone(),
            status: program.status.as_str(),
            is_draft: program.status == ProgramStatus::Draft,
            is_published: program.is_published(),
            is_archived: program.status == ProgramStatus::Archived,
            thumbnail_url: program.thumbnail_url.clone(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/program_form.html")]
pub struct ProgramFormTemplate {
    nav: Nav,
    heading: String,
    action: String,
    currency: String,
    form: ProgramFormValues,
    program: Option<ProgramMeta>,
    error: Option<String>,
    max_upload_kb: usize,
}

impl ProgramFormTemplate {
    fn new(st: &AppState, coach: &Profile, program: Option<&Program>) -> Self {
        let (heading, action) = match program {
            Some(p) => (format!("Edit {}", p.title), format!("/coach/programs/{}", p.id)),
            None => ("New program".to_string(), "/coach/programs".to_string()),
        };
        Self {
            nav: Nav::for_viewer(Some(coach)),
            heading,
            action,
            currency: st.program_service.currency().to_string(),
            form: program.map(ProgramFormValues::from).unwrap_or_default(),
            program: program.map(ProgramMeta::from),
            error: None,
            max_upload_kb: st.program_service.max_upload_bytes() / 1024,
        }
    }

    fn rejected(mut self, input: &ProgramInput, e: &AppError) -> Response {
        self.form = ProgramFormValues::from(input);
        self.error = Some(form_message(e));
        (e.status(), self).into_response()
    }
}

/// Renders an empty program editor.
///
/// # Endpoint
///
/// `GET /coach/programs/new`
pub async fn new_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
) -> ProgramFormTemplate {
    ProgramFormTemplate::new(&st, &coach, None)
}

/// Creates a draft program and opens its editor.
///
/// # Endpoint
///
/// `POST /coach/programs`
pub async fn create_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Form(input): Form<ProgramInput>,
) -> Result<Response, WebError> {
    match st.program_service.create(&coach, input.clone()).await {
        Ok(program) => {
            Ok(Redirect::to(&format!("/coach/programs/{}/edit", program.id)).into_response())
        }
        Err(e @ (AppError::Validation { .. } | AppError::Conflict { .. })) => {
            Ok(ProgramFormTemplate::new(&st, &coach, None).rejected(&input, &e))
        }
        Err(e) => Err(e.into()),
    }
}

/// Renders the editor for an existing program.
///
/// # Endpoint
///
/// `GET /coach/programs/{id}/edit`
pub async fn edit_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<ProgramFormTemplate, WebError> {
    let program = st.program_service.find_managed(&coach, id).await?;
    Ok(ProgramFormTemplate::new(&st, &coach, Some(&program)))
}

/// Saves the editor form.
///
/// # Endpoint
///
/// `POST /coach/programs/{id}`
pub async fn update_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
    Form(input): Form<ProgramInput>,
) -> Result<Response, WebError> {
    match st.program_service.update(&coach, id, input.clone()).await {
        Ok(program) => {
            Ok(Redirect::to(&format!("/coach/programs/{}/edit", program.id)).into_response())
        }
        Err(e @ AppError::Validation { .. }) => {
            let program = st.program_service.find_managed(&coach, id).await?;
            Ok(ProgramFormTemplate::new(&st, &coach, Some(&program)).rejected(&input, &e))
        }
        Err(e) => Err(e.into()),
    }
}

fn back_to_editor(id: i64) -> Redirect {
    Redirect::to(&format!("/coach/programs/{}/edit", id))
}

/// `POST /coach/programs/{id}/publish`
pub async fn publish_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    st.program_service.publish(&coach, id).await?;
    Ok(back_to_editor(id))
}

/// `POST /coach/programs/{id}/unpublish`
pub async fn unpublish_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    st.program_service.unpublish(&coach, id).await?;
    Ok(back_to_editor(id))
}

/// `POST /coach/programs/{id}/archive`
pub async fn archive_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    st.program_service.archive(&coach, id).await?;
    Ok(back_to_editor(id))
}

/// Deletes a program that never sold.
///
/// # Endpoint
///
/// `POST /coach/programs/{id}/delete`
pub async fn delete_program_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    st.program_service.delete(&coach, id).await?;
    Ok(Redirect::to("/coach"))
}

/// Replaces the program's thumbnail with an uploaded image.
///
/// Expects a `multipart/form-data` body with a `thumbnail` file field. The
/// request body limit is applied by the router.
///
/// # Endpoint
///
/// `POST /coach/programs/{id}/thumbnail`
pub async fn upload_thumbnail_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Redirect, WebError> {
    let upload_error =
        |e: axum::extract::multipart::MultipartError| AppError::bad_request(e.body_text(), json!({}));

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("thumbnail") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;

        st.program_service
            .upload_thumbnail(&coach, id, &content_type, bytes.to_vec())
            .await?;
        return Ok(back_to_editor(id));
    }

    Err(AppError::bad_request("Choose an image to upload", json!({ "field": "thumbnail" })).into())
}

pub struct MemberRow {
    display_name: String,
    email: String,
    status: &'static str,
    access: String,
    started: String,
    completed_days: i64,
    total_days: i64,
    percent: i64,
    last_activity: String,
}

impl From<MemberEnrollment> for MemberRow {
    fn from(member: MemberEnrollment) -> Self {
        Self {
            status: member.enrollment.status.as_str(),
            access: access_until(member.enrollment.expires_at),
            started: format_date(member.enrollment.starts_at),
            percent: completion_percent(member.completed_days, member.total_days),
            completed_days: member.completed_days,
            total_days: member.total_days,
            last_activity: member
                .last_activity
                .map(format_date)
                .unwrap_or_else(|| "-".to_string()),
            display_name: member.display_name,
            email: member.email,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/members.html")]
pub struct MembersTemplate {
    nav: Nav,
    program: Program,
    members: Vec<MemberRow>,
}

/// Lists a program's enrolled members with their progress.
///
/// # Endpoint
///
/// `GET /coach/programs/{id}/members`
pub async fn members_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(id): Path<i64>,
) -> Result<MembersTemplate, WebError> {
    let (program, members) = st.enrollment_service.members(&coach, id).await?;

    Ok(MembersTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        program,
        members: members.into_iter().map(MemberRow::from).collect(),
    })
}
