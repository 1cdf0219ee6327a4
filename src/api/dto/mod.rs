//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization. Responses are
//! built from domain entities through `From` conversions so internal fields
//! (owner ids, failure details) never leak.

pub mod health;
pub mod me;
pub mod pagination;
pub mod programs;
pub mod webhook;
