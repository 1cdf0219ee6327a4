//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer and wraps the
//! external services the application delegates to.
//!
//! # Modules
//!
//! - [`cache`] - Caching abstractions (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`identity`] - Authentication provider client
//! - [`payments`] - Payment gateway client
//! - [`storage`] - Object storage client for uploaded images

pub mod cache;
pub mod identity;
pub mod payments;
pub mod persistence;
pub mod storage;
