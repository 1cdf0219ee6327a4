//! Handlers for the public program catalog.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::programs::{DayOutline, ProgramDetailResponse, ProgramItem, ProgramListResponse};
use crate::application::services::program_service::MAX_PAGE_SIZE;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 12;

/// Lists published programs, newest first.
///
/// # Endpoint
///
/// `GET /api/programs?page=1&page_size=12`
///
/// # Errors
///
/// Returns 400 Bad Request if pagination parameters are invalid.
pub async fn program_list_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ProgramListResponse>, AppError> {
    let (page, page_size) = params
        .resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let catalog = state.program_service.catalog(page, page_size).await?;
    Ok(Json(ProgramListResponse::from(catalog)))
}

/// Returns a published program with its day outline.
///
/// # Endpoint
///
/// `GET /api/programs/{slug}`
///
/// # Errors
///
/// Returns 404 Not Found for unknown, draft and archived programs.
pub async fn program_detail_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProgramDetailResponse>, AppError> {
    let program = state.program_service.get_published(&slug).await?;
    let days = state.curriculum_service.days(program.id).await?;

    let description = program.description.clone();
    Ok(Json(ProgramDetailResponse {
        program: ProgramItem::from(program),
        description,
        days: days.iter().map(DayOutline::from).collect(),
    }))
}
