//! Web-specific middleware (cookie sessions).

pub mod web_auth;
