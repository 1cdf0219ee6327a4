//! Utility functions shared across layers.
//!
//! - [`code_generator`] - Order numbers and random suffixes
//! - [`slug`] - Program slugs
//! - [`redirect`] - Safe post-login redirect targets

pub mod code_generator;
pub mod redirect;
pub mod slug;
