//! Sign-in, sign-up and sign-out pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::application::services::{SignInInput, SignUpInput, SignUpResult};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::redirect::safe_next;
use crate::web::error::{WebError, form_message};
use crate::web::middleware::web_auth::{
    ACCESS_COOKIE, Viewer, cleared_cookies, read_cookie, session_cookies, with_cookies,
};
use crate::web::views::Nav;

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    nav: Nav,
    email: String,
    next: String,
    error: Option<String>,
    notice: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    nav: Nav,
    email: String,
    display_name: String,
    next: String,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    email: String,
    password: String,
    display_name: String,
    #[serde(default)]
    next: Option<String>,
}

/// Renders the login page. Signed-in users go straight to `next`.
///
/// # Endpoint
///
/// `GET /login?next=/path`
pub async fn login_page_handler(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref());
    if viewer.profile().is_some() {
        return Redirect::to(&next).into_response();
    }

    LoginTemplate {
        nav: Nav::default(),
        email: String::new(),
        next,
        error: None,
        notice: None,
    }
    .into_response()
}

/// Signs in with e-mail and password and stores the session in cookies.
///
/// Rejected credentials re-render the form with `401`.
///
/// # Endpoint
///
/// `POST /login`
pub async fn login_handler(
    State(st): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let next = safe_next(form.next.as_deref());
    let input = SignInInput {
        email: form.email.clone(),
        password: form.password,
    };

    match st.auth_service.sign_in(input).await {
        Ok((session, profile)) => {
            tracing::info!(user_id = %profile.id, "Signed in");
            let cookies = session_cookies(&session, st.web.cookie_secure);
            Ok(with_cookies(Redirect::to(&next).into_response(), cookies))
        }
        Err(e @ (AppError::Unauthorized { .. } | AppError::Validation { .. })) => {
            let status = e.status();
            let error = match e {
                AppError::Unauthorized { .. } => "Incorrect e-mail or password".to_string(),
                other => form_message(&other),
            };
            let page = LoginTemplate {
                nav: Nav::default(),
                email: form.email,
                next,
                error: Some(error),
                notice: None,
            };
            Ok((status, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Renders the sign-up page.
///
/// # Endpoint
///
/// `GET /signup`
pub async fn signup_page_handler(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref());
    if viewer.profile().is_some() {
        return Redirect::to(&next).into_response();
    }

    SignupTemplate {
        nav: Nav::default(),
        email: String::new(),
        display_name: String::new(),
        next,
        error: None,
    }
    .into_response()
}

/// Creates an account with the identity provider.
///
/// When the provider requires e-mail confirmation the login page is shown
/// with a notice instead of signing in.
///
/// # Endpoint
///
/// `POST /signup`
pub async fn signup_handler(
    State(st): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let next = safe_next(form.next.as_deref());
    let input = SignUpInput {
        email: form.email.clone(),
        password: form.password,
        display_name: form.display_name.clone(),
    };

    match st.auth_service.sign_up(input).await {
        Ok(SignUpResult::SignedIn { session, profile }) => {
            tracing::info!(user_id = %profile.id, "Signed up");
            let cookies = session_cookies(&session, st.web.cookie_secure);
            Ok(with_cookies(Redirect::to(&next).into_response(), cookies))
        }
        Ok(SignUpResult::ConfirmationRequired { email }) => {
            let page = LoginTemplate {
                nav: Nav::default(),
                notice: Some(format!(
                    "We sent a confirmation link to {}. Open it, then sign in here.",
                    email
                )),
                email,
                next,
                error: None,
            };
            Ok(page.into_response())
        }
        Err(e @ (AppError::Validation { .. } | AppError::Conflict { .. })) => {
            let page = SignupTemplate {
                nav: Nav::default(),
                email: form.email,
                display_name: form.display_name,
                next,
                error: Some(form_message(&e)),
            };
            Ok((e.status(), page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Revokes the session at the provider and clears the cookies.
///
/// # Endpoint
///
/// `POST /logout`
pub async fn logout_handler(State(st): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, ACCESS_COOKIE) {
        st.auth_service.sign_out(&token).await;
    }

    with_cookies(
        Redirect::to("/").into_response(),
        cleared_cookies(st.web.cookie_secure),
    )
}
