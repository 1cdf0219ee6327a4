//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and business rules. Services consume repository traits and provide
//! a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::auth_service::AuthService`] - Sign-up, sign-in and session resolution
//! - [`services::program_service::ProgramService`] - Catalog and program authoring
//! - [`services::curriculum_service::CurriculumService`] - Blueprint days and sections
//! - [`services::routine_service::RoutineBlockService`] - Routine block library
//! - [`services::order_service::OrderService`] - Checkout, payment confirmation and refunds
//! - [`services::enrollment_service::EnrollmentService`] - Access checks and grants
//! - [`services::progress_service::ProgressService`] - Day completion tracking

pub mod services;
