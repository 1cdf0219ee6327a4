//! Repository trait definitions for the domain layer.
//!
//! This module defines the repository interfaces (traits) that abstract data access
//! operations following the Repository pattern. These traits are implemented by
//! concrete repositories in the infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`ProfileRepository`] - User profiles and roles
//! - [`ProgramRepository`] - Program catalog and authoring
//! - [`CurriculumRepository`] - Blueprint days and sections
//! - [`RoutineBlockRepository`] - Routine blocks and exercises
//! - [`OrderRepository`] - Orders and payment state
//! - [`EnrollmentRepository`] - Access grants
//! - [`ProgressRepository`] - Completed days
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod curriculum_repository;
pub mod enrollment_repository;
pub mod order_repository;
pub mod profile_repository;
pub mod program_repository;
pub mod progress_repository;
pub mod routine_block_repository;

pub use curriculum_repository::CurriculumRepository;
pub use enrollment_repository::EnrollmentRepository;
pub use order_repository::OrderRepository;
pub use profile_repository::ProfileRepository;
pub use program_repository::ProgramRepository;
pub use progress_repository::ProgressRepository;
pub use routine_block_repository::RoutineBlockRepository;

#[cfg(test)]
pub use curriculum_repository::MockCurriculumRepository;
#[cfg(test)]
pub use enrollment_repository::MockEnrollmentRepository;
#[cfg(test)]
pub use order_repository::MockOrderRepository;
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
#[cfg(test)]
pub use program_repository::MockProgramRepository;
#[cfg(test)]
pub use progress_repository::MockProgressRepository;
#[cfg(test)]
pub use routine_block_repository::MockRoutineBlockRepository;
