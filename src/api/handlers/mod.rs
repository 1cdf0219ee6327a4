//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod me;
pub mod programs;
pub mod webhook;

pub use health::health_handler;
pub use me::{me_handler, my_enrollments_handler, my_orders_handler};
pub use programs::{program_detail_handler, program_list_handler};
pub use webhook::payment_webhook_handler;
