//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures with small, pure helpers (labels,
//! status transitions, access periods). Persistence and orchestration live in
//! the repository and service layers.
//!
//! # Entity Types
//!
//! - [`Profile`] - A user and their role
//! - [`Program`] - A coach-authored curriculum in the catalog
//! - [`Blueprint`] / [`Section`] - Per-day plan content
//! - [`RoutineBlock`] / [`Exercise`] - Reusable workout blocks
//! - [`Order`] - A purchase and its payment state
//! - [`Enrollment`] - A user's access grant to a program
//! - [`ProgressEntry`] - A completed plan day
//!
//! Creation inputs are separate `New*` structs; partial updates are `*Patch`
//! structs where `Some(None)` clears an optional column.

pub mod blueprint;
pub mod enrollment;
pub mod order;
pub mod page;
pub mod profile;
pub mod program;
pub mod progress;
pub mod routine_block;

#[cfg(test)]
pub(crate) mod fixtures;

pub use blueprint::{
    Blueprint, BlueprintDetail, BlueprintPatch, DAYS_PER_WEEK, MoveDirection, NewBlueprint,
    NewSection, Section, SectionDetail, SectionKind, SectionPatch,
};
pub use enrollment::{
    AccessPeriod, Enrollment, EnrollmentGrant, EnrollmentOverview, EnrollmentStatus,
    MemberEnrollment, OrderAccess, Revocation, completion_percent,
};
pub use order::{FREE_PAYMENT_METHOD, NewOrder, Order, OrderStatus, PaymentApproval};
pub use page::Page;
pub use profile::{NewProfile, Profile, Role};
pub use program::{
    NewProgram, Program, ProgramOverview, ProgramPatch, ProgramStatus, group_thousands,
};
pub use progress::{NewProgressEntry, ProgressEntry, ProgressSummary};
pub use routine_block::{
    Exercise, NewExercise, NewRoutineBlock, RoutineBlock, RoutineBlockDetail, RoutineBlockUpdate,
    TABATA_DEFAULT_ROUNDS, WorkoutFormat,
};
