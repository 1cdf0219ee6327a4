//! Progress entries: a member's completion records for blueprint days.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::enrollment::completion_percent;

/// Completion record for one blueprint day of an enrollment.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEntry {
    pub id: i64,
    pub enrollment_id: i64,
    pub blueprint_id: i64,
    pub day_number: i32,
    pub result: Option<String>,
    pub note: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Input for marking a day completed.
#[derive(Debug, Clone)]
pub struct NewProgressEntry {
    pub enrollment_id: i64,
    pub blueprint_id: i64,
    pub result: Option<String>,
    pub note: Option<String>,
}

/// Aggregate progress of an enrollment through its program's plan.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub total_days: i64,
    pub completed_days: i64,
    pub percent: i64,
    pub next_day: Option<i32>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProgressSummary {
    /// Builds the summary from the plan's day numbers and the recorded entries.
    ///
    /// Entries for days no longer in the plan are ignored.
    pub fn from_entries(plan_days: &[i32], entries: &[ProgressEntry]) -> Self {
        let completed_days = plan_days
            .iter()
            .filter(|day| entries.iter().any(|e| e.day_number == **day))
            .count() as i64;

        let next_day = plan_days
            .iter()
            .copied()
            .filter(|day| !entries.iter().any(|e| e.day_number == *day))
            .min();

        let total_days = plan_days.len() as i64;

        Self {
            total_days,
            completed_days,
            percent: completion_percent(completed_days, total_days),
            next_day,
            last_activity: entries.iter().map(|e| e.completed_at).max(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.total_days > 0 && self.completed_days == self.total_days
    }
}
