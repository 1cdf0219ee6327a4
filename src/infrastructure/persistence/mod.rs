//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx. Queries are
//! checked at runtime and mapped through `FromRow` row structs; enum columns
//! are stored as text and parsed on the way out.
//!
//! # Repositories
//!
//! - [`PgProfileRepository`] - User profiles
//! - [`PgProgramRepository`] - Program catalog
//! - [`PgCurriculumRepository`] - Blueprint days and sections
//! - [`PgRoutineBlockRepository`] - Routine blocks and exercises
//! - [`PgOrderRepository`] - Orders, including the completion and refund transactions
//! - [`PgEnrollmentRepository`] - Enrollments and expiry
//! - [`PgProgressRepository`] - Progress entries

pub mod pg_curriculum_repository;
pub mod pg_enrollment_repository;
pub mod pg_order_repository;
pub mod pg_profile_repository;
pub mod pg_program_repository;
pub mod pg_progress_repository;
pub mod pg_routine_block_repository;

pub use pg_curriculum_repository::PgCurriculumRepository;
pub use pg_enrollment_repository::PgEnrollmentRepository;
pub use pg_order_repository::PgOrderRepository;
pub use pg_profile_repository::PgProfileRepository;
pub use pg_program_repository::PgProgramRepository;
pub use pg_progress_repository::PgProgressRepository;
pub use pg_routine_block_repository::PgRoutineBlockRepository;
