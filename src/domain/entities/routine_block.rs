//! Routine blocks: reusable named sets of exercises with a workout format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Default number of intervals in a Tabata block.
pub const TABATA_DEFAULT_ROUNDS: i32 = 8;

/// How a routine block is performed and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutFormat {
    ForTime,
    Amrap,
    Emom,
    Rounds,
    Tabata,
    Strength,
    Custom,
}

impl WorkoutFormat {
    pub const ALL: [WorkoutFormat; 7] = [
        WorkoutFormat::ForTime,
        WorkoutFormat::Amrap,
        WorkoutFormat::Emom,
        WorkoutFormat::Rounds,
        WorkoutFormat::Tabata,
        WorkoutFormat::Strength,
        WorkoutFormat::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutFormat::ForTime => "for_time",
            WorkoutFormat::Amrap => "amrap",
            WorkoutFormat::Emom => "emom",
            WorkoutFormat::Rounds => "rounds",
            WorkoutFormat::Tabata => "tabata",
            WorkoutFormat::Strength => "strength",
            WorkoutFormat::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkoutFormat::ForTime => "For time",
            WorkoutFormat::Amrap => "AMRAP",
            WorkoutFormat::Emom => "EMOM",
            WorkoutFormat::Rounds => "Rounds",
            WorkoutFormat::Tabata => "Tabata",
            WorkoutFormat::Strength => "Strength",
            WorkoutFormat::Custom => "Custom",
        }
    }

    /// Checks the timing parameters required by this format and fills defaults.
    ///
    /// Returns the normalized `(time_cap_minutes, rounds)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if a required value is missing or a
    /// value is not positive.
    pub fn normalize(
        &self,
        time_cap_minutes: Option<i32>,
        rounds: Option<i32>,
    ) -> Result<(Option<i32>, Option<i32>), AppError> {
        for (field, value) in [("time_cap_minutes", time_cap_minutes), ("rounds", rounds)] {
            if let Some(v) = value
                && v <= 0
            {
                return Err(AppError::bad_request(
                    "Value must be positive",
                    json!({ "field": field, "value": v }),
                ));
            }
        }

        match self {
            WorkoutFormat::Amrap | WorkoutFormat::Emom if time_cap_minutes.is_none() => {
                Err(AppError::bad_request(
                    "This format requires a time cap",
                    json!({ "format": self.as_str() }),
                ))
            }
            WorkoutFormat::Rounds if rounds.is_none() => Err(AppError::bad_request(
                "This format requires a round count",
                json!({ "format": self.as_str() }),
            )),
            WorkoutFormat::Tabata => Ok((
                time_cap_minutes,
                Some(rounds.unwrap_or(TABATA_DEFAULT_ROUNDS)),
            )),
            _ => Ok((time_cap_minutes, rounds)),
        }
    }
}

impl FromStr for WorkoutFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkoutFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AppError::bad_request("Unknown workout format", json!({ "format": s })))
    }
}

/// A reusable block of exercises owned by a coach.
#[derive(Debug, Clone, Serialize)]
pub struct RoutineBlock {
    pub id: i64,
    pub coach_id: Uuid,
    pub name: String,
    pub format: WorkoutFormat,
    pub time_cap_minutes: Option<i32>,
    pub rounds: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoutineBlock {
    /// Summary of the format with its timing, e.g. `AMRAP 20 min`.
    pub fn format_label(&self) -> String {
        match (self.format, self.time_cap_minutes, self.rounds) {
            (WorkoutFormat::Amrap, Some(cap), _) => format!("AMRAP {} min", cap),
            (WorkoutFormat::Emom, Some(cap), _) => format!("EMOM {} min", cap),
            (WorkoutFormat::ForTime, Some(cap), _) => format!("For time (cap {} min)", cap),
            (WorkoutFormat::Rounds, _, Some(1)) => "1 round".to_string(),
            (WorkoutFormat::Rounds, Some(cap), Some(n)) => {
                format!("{} rounds (cap {} min)", n, cap)
            }
            (WorkoutFormat::Rounds, None, Some(n)) => format!("{} rounds", n),
            (WorkoutFormat::Tabata, _, Some(n)) => format!("Tabata × {}", n),
            (format, _, _) => format.label().to_string(),
        }
    }
}

/// Input for creating a routine block.
#[derive(Debug, Clone)]
pub struct NewRoutineBlock {
    pub coach_id: Uuid,
    pub name: String,
    pub format: WorkoutFormat,
    pub time_cap_minutes: Option<i32>,
    pub rounds: Option<i32>,
    pub description: Option<String>,
}

/// Full replacement of a routine block's editable fields.
#[derive(Debug, Clone)]
pub struct RoutineBlockUpdate {
    pub name: String,
    pub format: WorkoutFormat,
    pub time_cap_minutes: Option<i32>,
    pub rounds: Option<i32>,
    pub description: Option<String>,
}

/// One exercise line inside a routine block.
#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: i64,
    pub routine_block_id: i64,
    pub position: i32,
    pub name: String,
    pub reps: Option<String>,
    pub load: Option<String>,
    pub notes: Option<String>,
}

impl Exercise {
    /// Prescription line, e.g. `15 × Thruster @ 43/30 kg`.
    pub fn prescription(&self) -> String {
        let mut line = match &self.reps {
            Some(reps) => format!("{} × {}", reps, self.name),
            None => self.name.clone(),
        };
        if let Some(load) = &self.load {
            line.push_str(" @ ");
            line.push_str(load);
        }
        line
    }
}

/// Input for appending an exercise to a block.
#[derive(Debug, Clone)]
pub struct NewExercise {
    pub routine_block_id: i64,
    pub name: String,
    pub reps: Option<String>,
    pub load: Option<String>,
    pub notes: Option<String>,
}

/// A routine block with its exercises in order.
#[derive(Debug, Clone)]
pub struct RoutineBlockDetail {
    pub block: RoutineBlock,
    pub exercises: Vec<Exercise>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::routine_block;

    #[test]
    fn test_amrap_requires_time_cap() {
        assert!(WorkoutFormat::Amrap.normalize(None, None).is_err());
        assert_eq!(
            WorkoutFormat::Amrap.normalize(Some(20), None).unwrap(),
            (Some(20), None)
        );
    }

    #[test]
    fn test_rounds_requires_count() {
        assert!(WorkoutFormat::Rounds.normalize(Some(20), None).is_err());
        assert!(WorkoutFormat::Rounds.normalize(None, Some(5)).is_ok());
    }

    #[test]
    fn test_tabata_defaults_rounds() {
        assert_eq!(
            WorkoutFormat::Tabata.normalize(None, None).unwrap(),
            (None, Some(TABATA_DEFAULT_ROUNDS))
        );
    }

    #[test]
    fn test_non_positive_values_rejected() {
        assert!(WorkoutFormat::ForTime.normalize(Some(0), None).is_err());
        assert!(WorkoutFormat::Custom.normalize(None, Some(-1)).is_err());
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(
            routine_block(WorkoutFormat::Amrap, Some(20), None).format_label(),
            "AMRAP 20 min"
        );
        assert_eq!(
            routine_block(WorkoutFormat::ForTime, Some(15), None).format_label(),
            "For time (cap 15 min)"
        );
        assert_eq!(
            routine_block(WorkoutFormat::ForTime, None, None).format_label(),
            "For time"
        );
        assert_eq!(
            routine_block(WorkoutFormat::Rounds, None, Some(5)).format_label(),
            "5 rounds"
        );
        assert_eq!(
            routine_block(WorkoutFormat::Rounds, Some(12), Some(3)).format_label(),
            "3 rounds (cap 12 min)"
        );
        assert_eq!(
            routine_block(WorkoutFormat::Strength, None, None).format_label(),
            "Strength"
        );
    }

    #[test]
    fn test_exercise_prescription() {
        let exercise = Exercise {
            id: 1,
            routine_block_id: 1,
            position: 1,
            name: "Thruster".to_string(),
            reps: Some("15".to_string()),
            load: Some("43/30 kg".to_string()),
            notes: None,
        };
        assert_eq!(exercise.prescription(), "15 × Thruster @ 43/30 kg");

        let plain = Exercise {
            reps: None,
            load: None,
            ..exercise
        };
        assert_eq!(plain.prescription(), "Thruster");
    }

    #[test]
    fn test_format_parsing() {
        for format in WorkoutFormat::ALL {
            assert_eq!(format.as_str().parse::<WorkoutFormat>().unwrap(), format);
        }
        assert!("crossfit".parse::<WorkoutFormat>().is_err());
    }
}
