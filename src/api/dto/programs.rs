//! DTOs for the public program catalog.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::dto::pagination::PaginationMeta;
use crate::domain::entities::{Blueprint, Page, Program};

/// A program as listed in the catalog.
#[derive(Debug, Serialize)]
pub struct ProgramItem {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub price: i64,
    pub currency: String,
    /// `null` for lifetime access.
    pub access_days: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<Program> for ProgramItem {
    fn from(program: Program) -> Self {
        Self {
            slug: program.slug,
            title: program.title,
            summary: program.summary,
            price: program.price,
            currency: program.currency,
            access_days: program.access_days,
            thumbnail_url: program.thumbnail_url,
            published_at: program.published_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgramListResponse {
    pub items: Vec<ProgramItem>,
    pub pagination: PaginationMeta,
}

impl From<Page<Program>> for ProgramListResponse {
    fn from(page: Page<Program>) -> Self {
        let pagination = PaginationMeta::from(&page);
        Self {
            items: page.items.into_iter().map(ProgramItem::from).collect(),
            pagination,
        }
    }
}

/// Outline entry for one day; day content is only served to enrolled members.
#[derive(Debug, Serialize)]
pub struct DayOutline {
    pub day_number: i32,
    pub label: String,
    pub title: String,
    pub is_rest_day: bool,
}

impl From<&Blueprint> for DayOutline {
    fn from(day: &Blueprint) -> Self {
        Self {
            day_number: day.day_number,
            label: day.label(),
            title: day.title.clone(),
            is_rest_day: day.is_rest_day,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgramDetailResponse {
    #[serde(flatten)]
    pub program: ProgramItem,
    pub description: String,
    pub days: Vec<DayOutline>,
}
