//! Public catalog pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde_json::json;

use crate::api::dto::pagination::PaginationParams;
use crate::application::services::Access;
use crate::domain::entities::Program;
use crate::error::AppError;
use crate::state::AppState;
use crate::web::error::{WebError, login_url};
use crate::web::middleware::web_auth::Viewer;
use crate::web::views::{Nav, Pager, access_until};

const CATALOG_PAGE_SIZE: i64 = 12;

#[derive(Template, WebTemplate)]
#[template(path = "catalog.html")]
pub struct CatalogTemplate {
    nav: Nav,
    programs: Vec<Program>,
    pager: Pager,
}

/// Renders the catalog of published programs.
///
/// # Endpoint
///
/// `GET /?page=N`
pub async fn catalog_handler(
    State(st): State<AppState>,
    viewer: Viewer,
    Query(params): Query<PaginationParams>,
) -> Result<CatalogTemplate, WebError> {
    let (page, page_size) = params
        .resolve(CATALOG_PAGE_SIZE, CATALOG_PAGE_SIZE)
        .map_err(|msg| AppError::bad_request(msg, json!({})))?;

    let programs = st.program_service.catalog(page, page_size).await?;

    Ok(CatalogTemplate {
        nav: Nav::for_viewer(viewer.profile()),
        pager: Pager::new(&programs),
        programs: programs.items,
    })
}

pub struct DayLine {
    label: String,
    title: String,
    is_rest_day: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "program.html")]
pub struct ProgramTemplate {
    nav: Nav,
    program: Program,
    days: Vec<DayLine>,
    can_learn: bool,
    can_manage: bool,
    can_buy: bool,
    buy_label: String,
    access_note: Option<String>,
    login_href: String,
}

/// Renders a program's sales page with its day outline.
///
/// Drafts and archived programs are only shown to their coach and admins.
///
/// # Endpoint
///
/// `GET /programs/{slug}`
pub async fn program_page_handler(
    State(st): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<ProgramTemplate, WebError> {
    let program = st.program_service.get_by_slug(&slug).await?;
    let access = st
        .enrollment_service
        .access(viewer.profile(), &program)
        .await?;

    let can_manage = matches!(access, Access::Owner | Access::Admin);
    if !program.is_published() && !can_manage {
        return Err(AppError::not_found("Program not found", json!({ "slug": slug })).into());
    }

    let days = st
        .curriculum_service
        .days(program.id)
        .await?
        .iter()
        .map(|day| DayLine {
            label: day.label(),
            title: day.title.clone(),
            is_rest_day: day.is_rest_day,
        })
        .collect();

    let enrollment = access.enrollment();
    let access_note = enrollment.map(|e| format!("Your access runs {}", access_until(e.expires_at)));

    // Time-limited members may buy again to extend.
    let can_buy = viewer.profile().is_some()
        && program.is_published()
        && !can_manage
        && enrollment.is_none_or(|e| !e.is_lifetime());

    let buy_label = match (program.is_free(), enrollment.is_some()) {
        (true, false) => "Start for free".to_string(),
        (true, true) => "Renew for free".to_string(),
        (false, false) => format!("Buy for {}", program.price_label()),
        (false, true) => format!("Extend for {}", program.price_label()),
    };

    Ok(ProgramTemplate {
        nav: Nav::for_viewer(viewer.profile()),
        login_href: login_url(&format!("/programs/{}", program.slug)),
        can_learn: access.can_learn(),
        can_manage,
        can_buy,
        buy_label,
        access_note,
        days,
        program,
    })
}
