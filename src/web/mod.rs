//! Web layer for browser-based UI.
//!
//! Server-rendered pages for the catalog, checkout, training and the coach
//! area. Uses Askama templates from `templates/` and cookie sessions.
//!
//! # Modules
//!
//! - [`handlers`] - Template rendering handlers
//! - [`middleware`] - Cookie session resolution and user extractors
//! - [`routes`] - Page route configuration
//! - [`error`] - HTML error pages
//! - [`views`] - View models shared by templates

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod views;

pub use error::WebError;
