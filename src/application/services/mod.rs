//! Business logic services for the application layer.

pub mod auth_service;
pub mod authorization;
pub mod curriculum_service;
pub mod enrollment_service;
pub mod order_service;
pub mod program_service;
pub mod progress_service;
pub mod routine_service;

pub use auth_service::{AuthService, SignInInput, SignUpInput, SignUpResult};
pub use curriculum_service::{CurriculumService, DayInput, SectionInput};
pub use enrollment_service::{Access, EnrollmentService};
pub use order_service::{CheckoutSession, CheckoutSettings, CheckoutStart, OrderService};
pub use program_service::{ProgramInput, ProgramService};
pub use progress_service::{ProgramProgress, ProgressInput, ProgressService};
pub use routine_service::{ExerciseInput, RoutineBlockService, RoutineInput};
