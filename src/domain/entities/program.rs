//! Program entity representing a coach-authored fitness curriculum.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Publication state of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    Draft,
    Published,
    Archived,
}

impl ProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramStatus::Draft => "draft",
            ProgramStatus::Published => "published",
            ProgramStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProgramStatus::Draft),
            "published" => Ok(ProgramStatus::Published),
            "archived" => Ok(ProgramStatus::Archived),
            other => Err(AppError::bad_request(
                "Unknown program status",
                json!({ "status": other }),
            )),
        }
    }
}

/// A program sold in the catalog.
///
/// `price` is stored in minor currency units. `access_days = None` means the
/// enrollment never expires.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub id: i64,
    pub coach_id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub access_days: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub status: ProgramStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }

    pub fn is_published(&self) -> bool {
        self.status == ProgramStatus::Published
    }

    pub fn is_owned_by(&self, user_id: &Uuid) -> bool {
        &self.coach_id == user_id
    }

    /// Human-readable access period, e.g. `90 days` or `Lifetime access`.
    pub fn access_label(&self) -> String {
        match self.access_days {
            Some(1) => "1 day".to_string(),
            Some(days) => format!("{} days", days),
            None => "Lifetime access".to_string(),
        }
    }

    /// Price formatted with thousands separators and currency, e.g. `49,000 KRW`.
    pub fn price_label(&self) -> String {
        if self.is_free() {
            return "Free".to_string();
        }
        format!("{} {}", group_thousands(self.price), self.currency)
    }
}

/// Formats an integer amount with comma thousands separators.
pub fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if amount < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Input data for creating a program. New programs start as drafts.
#[derive(Debug, Clone)]
pub struct NewProgram {
    pub coach_id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub access_days: Option<i32>,
}

/// Partial update for a program.
///
/// `None` fields are left unchanged; `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default)]
pub struct ProgramPatch {
    pub title: Option<String>,
    pub summary: Option<Option<String>>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub access_days: Option<Option<i32>>,
    pub thumbnail_url: Option<Option<String>>,
}

/// A coach's program together with its sales figures.
#[derive(Debug, Clone)]
pub struct ProgramOverview {
    pub program: Program,
    pub active_members: i64,
    pub days: i64,
    pub revenue: i64,
}
