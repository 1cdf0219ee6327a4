//! Cookie-based session handling for the web pages.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue, Method,
        header::{COOKIE, REFERER, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use serde_json::json;
use std::convert::Infallible;

use crate::domain::entities::Profile;
use crate::error::AppError;
use crate::infrastructure::identity::Session;
use crate::state::AppState;
use crate::web::error::WebError;

/// Cookie holding the identity provider access token.
pub const ACCESS_COOKIE: &str = "cp_access";
/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "cp_refresh";

const REFRESH_MAX_AGE_SECONDS: i64 = 60 * 60 * 24 * 30;

/// The signed-in user of the current request, if any.
///
/// Inserted by [`layer`] on every web request; handlers that render for both
/// guests and members take it as an extractor.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Profile>);

impl Viewer {
    pub fn profile(&self) -> Option<&Profile> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// A signed-in user. Guests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Profile);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer(Some(profile))) => Ok(CurrentUser(profile.clone())),
            _ => Err(WebError::login(return_path(parts))),
        }
    }
}

/// A signed-in coach or admin.
#[derive(Debug, Clone)]
pub struct CoachUser(pub Profile);

impl<S: Send + Sync> FromRequestParts<S> for CoachUser {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(profile) = CurrentUser::from_request_parts(parts, state).await?;
        if !profile.can_author() {
            return Err(AppError::forbidden(
                "Only coaches can open the coach area",
                json!({ "role": profile.role }),
            )
            .into());
        }
        Ok(CoachUser(profile))
    }
}

/// Where to send the user back to after signing in.
///
/// GET requests return to themselves. Form posts return to the page the form
/// was on, taken from `Referer` when it is a local URL.
fn return_path(parts: &Parts) -> String {
    if parts.method == Method::GET {
        return parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
    }

    parts
        .headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map(|url| match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        })
        .unwrap_or_else(|| "/".to_string())
}

/// Reads a cookie value from the `Cookie` header.
///
/// Handles multiple cookies in one header by splitting on semicolons and
/// ignoring unrelated pairs.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key == name && !value.is_empty() => {
                    Some(value.to_string())
                }
                _ => None,
            }
        })
}

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` values storing a fresh session.
pub fn session_cookies(session: &Session, secure: bool) -> Vec<HeaderValue> {
    [
        cookie(ACCESS_COOKIE, &session.access_token, session.expires_in, secure),
        cookie(
            REFRESH_COOKIE,
            &session.refresh_token,
            REFRESH_MAX_AGE_SECONDS,
            secure,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// `Set-Cookie` values removing the session.
pub fn cleared_cookies(secure: bool) -> Vec<HeaderValue> {
    [
        cookie(ACCESS_COOKIE, "", 0, secure),
        cookie(REFRESH_COOKIE, "", 0, secure),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Appends `Set-Cookie` headers to a response.
pub fn with_cookies(mut response: Response, cookies: Vec<HeaderValue>) -> Response {
    let headers = response.headers_mut();
    for value in cookies {
        headers.append(SET_COOKIE, value);
    }
    response
}

enum Resolution {
    Anonymous,
    Authenticated(Profile),
    Refreshed(Session, Profile),
    Expired,
}

async fn resolve(st: &AppState, access: Option<String>, refresh: Option<String>) -> Resolution {
    if let Some(token) = access {
        match st.auth_service.authenticate(&token).await {
            Ok(profile) => return Resolution::Authenticated(profile),
            Err(AppError::Unauthorized { .. }) => {}
            Err(e) => {
                // Provider trouble is not a reason to sign the user out.
                tracing::warn!(error = %e, "Could not resolve web session");
                return Resolution::Anonymous;
            }
        }
    }

    let Some(refresh) = refresh else {
        return Resolution::Anonymous;
    };

    match st.auth_service.refresh(&refresh).await {
        Ok((session, profile)) => Resolution::Refreshed(session, profile),
        Err(AppError::Unauthorized { .. }) => Resolution::Expired,
        Err(e) => {
            tracing::warn!(error = %e, "Could not refresh web session");
            Resolution::Anonymous
        }
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", ACCESS_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// Resolves the session cookies of every web request into a [`Viewer`].
///
/// # Cookie Format
///
/// ```text
/// Cookie: cp_access=<access token>; cp_refresh=<refresh token>
/// ```
///
/// # Flow
///
/// 1. Validate `cp_access` via [`crate::application::services::AuthService`]
/// 2. If it is missing or rejected, try `cp_refresh` and store the new
///    session in fresh cookies
/// 3. If the refresh token is rejected too, clear both cookies
///
/// The layer never rejects a request; pages that need a user take the
/// [`CurrentUser`] or [`CoachUser`] extractor, which redirect to `/login`.
/// Cookies written by the handler itself (sign-in, sign-out) take precedence
/// over a renewal made here.
pub async fn layer(State(st): State<AppState>, mut req: Request, next: Next) -> Response {
    let access = read_cookie(req.headers(), ACCESS_COOKIE);
    let refresh = read_cookie(req.headers(), REFRESH_COOKIE);
    let secure = st.web.cookie_secure;

    let (viewer, cookies) = match resolve(&st, access, refresh).await {
        Resolution::Anonymous => (None, Vec::new()),
        Resolution::Authenticated(profile) => (Some(profile), Vec::new()),
        Resolution::Refreshed(session, profile) => {
            tracing::debug!(user_id = %profile.id, "Web session refreshed");
            (Some(profile), session_cookies(&session, secure))
        }
        Resolution::Expired => (None, cleared_cookies(secure)),
    };

    req.extensions_mut().insert(Viewer(viewer));
    let response = next.run(req).await;

    if cookies.is_empty() || sets_session_cookie(&response) {
        return response;
    }
    with_cookies(response, cookies)
}
