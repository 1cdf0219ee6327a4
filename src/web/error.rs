//! HTML error responses for the web layer.

use askama::Template;
use askama_web::WebTemplate;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::AppError;
use crate::web::views::Nav;

#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
struct ErrorTemplate {
    nav: Nav,
    status: u16,
    title: String,
    message: String,
}

/// Error type returned by page handlers.
///
/// Renders `templates/error.html` instead of the JSON envelope used by the
/// API. Unauthenticated requests are sent to the login page.
#[derive(Debug)]
pub enum WebError {
    /// The page needs a signed-in user; `next` is where to return afterwards.
    Login { next: String },
    App(AppError),
}

impl WebError {
    pub fn login(next: impl Into<String>) -> Self {
        WebError::Login { next: next.into() }
    }
}

impl From<AppError> for WebError {
    fn from(e: AppError) -> Self {
        WebError::App(e)
    }
}

/// `/login?next=<encoded path>`
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/login?next={}", encoded)
}

/// A message suitable for showing next to a form.
///
/// Validation failures carry per-field messages in their details; the first
/// one is more useful to a person than the generic summary.
pub fn form_message(e: &AppError) -> String {
    if let AppError::Validation { details, .. } = e
        && let Some(fields) = details.get("fields").and_then(|f| f.as_object())
        && let Some(message) = fields
            .values()
            .filter_map(|errors| errors.as_array())
            .flatten()
            .find_map(|error| error.get("message").and_then(|m| m.as_str()))
    {
        return message.to_string();
    }
    e.message().to_string()
}

fn title_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Please check your input",
        StatusCode::FORBIDDEN => "Not allowed",
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::CONFLICT => "That cannot be done right now",
        StatusCode::PAYMENT_REQUIRED => "Payment failed",
        StatusCode::BAD_GATEWAY => "A partner service is unavailable",
        _ => "Something went wrong",
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let e = match self {
            WebError::Login { next } => return Redirect::to(&login_url(&next)).into_response(),
            WebError::App(AppError::Unauthorized { .. }) => {
                return Redirect::to("/login").into_response();
            }
            WebError::App(e) => e,
        };

        let status = e.status();
        if status.is_server_error() {
            tracing::error!(code = e.code(), error = %e, "Page request failed");
        }

        // Internal details stay in the log.
        let message = if status.is_server_error() {
            "Please try again in a moment.".to_string()
        } else {
            form_message(&e)
        };

        let page = ErrorTemplate {
            nav: Nav::default(),
            status: status.as_u16(),
            title: title_for(status).to_string(),
            message,
        };
        (status, page).into_response()
    }
}
