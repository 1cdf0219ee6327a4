//! View models shared by the page templates.
//!
//! Templates receive plain strings and flags prepared here so that
//! formatting rules live in Rust, not in template expressions.

use chrono::{DateTime, Utc};

use crate::domain::entities::{Profile, group_thousands};

/// Navigation bar state.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub signed_in: bool,
    pub display_name: String,
    pub is_coach: bool,
}

impl Nav {
    pub fn for_viewer(viewer: Option<&Profile>) -> Self {
        match viewer {
            Some(profile) => Self {
                signed_in: true,
                display_name: profile.display_name.clone(),
                is_coach: profile.can_author(),
            },
            None => Self::default(),
        }
    }
}

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

/// Previous/next links for paginated listings.
#[derive(Debug, Clone)]
pub struct Pager {
    pub page: i64,
    pub total_pages: i64,
    pub prev: Option<i64>,
    pub next: Option<i64>,
}

impl Pager {
    pub fn new<T>(page: &crate::domain::entities::Page<T>) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages().max(1),
            prev: page.has_prev().then(|| page.page - 1),
            next: page.has_next().then(|| page.page + 1),
        }
    }
}

/// `2026-03-09`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// `2026-03-09 14:05 UTC`
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `49,000 KRW`, or `Free` for zero.
pub fn money(amount: i64, currency: &str) -> String {
    if amount == 0 {
        return "Free".to_string();
    }
    format!("{} {}", group_thousands(amount), currency)
}

/// `until 2026-03-09`, or `lifetime` without expiry.
pub fn access_until(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => format!("until {}", format_date(at)),
        None => "lifetime".to_string(),
    }
}
