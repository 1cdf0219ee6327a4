//! Curriculum content: per-day blueprints and their ordered sections.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::str::FromStr;

use crate::domain::entities::routine_block::RoutineBlockDetail;
use crate::error::AppError;

/// Number of days grouped into one curriculum week.
pub const DAYS_PER_WEEK: i32 = 7;

/// A per-day content container inside a program's curriculum plan.
#[derive(Debug, Clone, Serialize)]
pub struct Blueprint {
    pub id: i64,
    pub program_id: i64,
    pub day_number: i32,
    pub title: String,
    pub notes: Option<String>,
    pub is_rest_day: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blueprint {
    /// 1-based week this day belongs to.
    pub fn week_number(&self) -> i32 {
        (self.day_number - 1) / DAYS_PER_WEEK + 1
    }

    /// 1-based day within its week.
    pub fn day_of_week(&self) -> i32 {
        (self.day_number - 1) % DAYS_PER_WEEK + 1
    }

    /// Display label, e.g. `Week 2 · Day 3`.
    pub fn label(&self) -> String {
        format!("Week {} · Day {}", self.week_number(), self.day_of_week())
    }
}

/// Input for creating a blueprint day.
#[derive(Debug, Clone)]
pub struct NewBlueprint {
    pub program_id: i64,
    pub day_number: i32,
    pub title: String,
    pub notes: Option<String>,
    pub is_rest_day: bool,
}

/// Partial update for a blueprint day.
#[derive(Debug, Clone, Default)]
pub struct BlueprintPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub is_rest_day: Option<bool>,
}

/// Kind of content a section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Warmup,
    Skill,
    Strength,
    Workout,
    Accessory,
    Cooldown,
    Note,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Warmup,
        SectionKind::Skill,
        SectionKind::Strength,
        SectionKind::Workout,
        SectionKind::Accessory,
        SectionKind::Cooldown,
        SectionKind::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Warmup => "warmup",
            SectionKind::Skill => "skill",
            SectionKind::Strength => "strength",
            SectionKind::Workout => "workout",
            SectionKind::Accessory => "accessory",
            SectionKind::Cooldown => "cooldown",
            SectionKind::Note => "note",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Warmup => "Warm-up",
            SectionKind::Skill => "Skill",
            SectionKind::Strength => "Strength",
            SectionKind::Workout => "Workout",
            SectionKind::Accessory => "Accessory",
            SectionKind::Cooldown => "Cool-down",
            SectionKind::Note => "Note",
        }
    }
}

impl FromStr for SectionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::bad_request("Unknown section kind", json!({ "kind": s })))
    }
}

/// An ordered piece of a blueprint day.
///
/// `position` is dense and 1-based within its blueprint.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub id: i64,
    pub blueprint_id: i64,
    pub position: i32,
    pub kind: SectionKind,
    pub title: String,
    pub body: Option<String>,
    pub routine_block_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a section to a blueprint.
#[derive(Debug, Clone)]
pub struct NewSection {
    pub blueprint_id: i64,
    pub kind: SectionKind,
    pub title: String,
    pub body: Option<String>,
    pub routine_block_id: Option<i64>,
}

/// Partial update for a section.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub kind: Option<SectionKind>,
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub routine_block_id: Option<Option<i64>>,
}

/// Direction for reordering a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    /// Position of the neighbour to swap with, or `None` at the edge.
    pub fn target_position(&self, position: i32, count: i32) -> Option<i32> {
        match self {
            MoveDirection::Up if position > 1 => Some(position - 1),
            MoveDirection::Down if position < count => Some(position + 1),
            _ => None,
        }
    }
}

impl FromStr for MoveDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(AppError::bad_request(
                "Unknown direction",
                json!({ "direction": other }),
            )),
        }
    }
}

/// A section together with the routine block it embeds.
#[derive(Debug, Clone)]
pub struct SectionDetail {
    pub section: Section,
    pub routine: Option<RoutineBlockDetail>,
}

/// A blueprint day with all of its content resolved.
#[derive(Debug, Clone)]
pub struct BlueprintDetail {
    pub blueprint: Blueprint,
    pub sections: Vec<SectionDetail>,
}
