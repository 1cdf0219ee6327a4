//! Identity provider backed by a GoTrue-compatible REST API (Supabase Auth).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::provider::{IdentityProvider, IdentityUser, Session, SignUpOutcome};
use crate::error::AppError;

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<UserBody> for IdentityUser {
    fn from(body: UserBody) -> Self {
        IdentityUser {
            id: body.id,
            email: body.email.unwrap_or_default(),
            display_name: body
                .user_metadata
                .get("display_name")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    user: UserBody,
}

impl From<SessionBody> for Session {
    fn from(body: SessionBody) -> Self {
        Session {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
            user: body.user.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(SessionBody),
    User(UserBody),
}

/// GoTrue REST client.
///
/// `base_url` is the auth endpoint root, e.g. `https://<project>.supabase.co/auth/v1`.
pub struct SupabaseIdentity {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(http: Client, base_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, AppError> {
        request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Identity provider unreachable");
                AppError::upstream("Authentication service unavailable", json!({}))
            })
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AppError> {
        let response = self
            .send(
                self.http
                    .post(self.url("/token"))
                    .query(&[("grant_type", grant_type)])
                    .json(&body),
            )
            .await?;

        match response.status() {
            s if s.is_success() => Ok(parse::<SessionBody>(response).await?.into()),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AppError::unauthorized(
                "Invalid credentials",
                json!({ "grant_type": grant_type }),
            )),
            _ => Err(provider_error(response).await),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AppError> {
        let response = self
            .send(self.http.post(self.url("/signup")).json(&json!({
                "email": email,
                "password": password,
                "data": { "display_name": display_name },
            })))
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        Ok(match parse::<SignUpBody>(response).await? {
            SignUpBody::Session(session) => SignUpOutcome::SignedIn(session.into()),
            SignUpBody::User(user) => SignUpOutcome::ConfirmationRequired(user.into()),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn user(&self, access_token: &str) -> Result<IdentityUser, AppError> {
        let response = self
            .send(self.http.get(self.url("/user")).bearer_auth(access_token))
            .await?;

        match response.status() {
            s if s.is_success() => Ok(parse::<UserBody>(response).await?.into()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::unauthorized(
                "Session expired",
                json!({ "reason": "Invalid or expired access token" }),
            )),
            _ => Err(provider_error(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .send(self.http.post(self.url("/logout")).bearer_auth(access_token))
            .await?;

        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(provider_error(response).await)
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AppError> {
    response.json::<T>().await.map_err(|e| {
        tracing::error!(error = %e, "Unexpected identity provider response");
        AppError::upstream("Unexpected authentication service response", json!({}))
    })
}

/// Maps a non-success provider response to an application error.
///
/// 4xx answers carry a human-readable reason in `msg` or `error_description`
/// and become validation errors; everything else is an upstream failure.
async fn provider_error(response: Response) -> AppError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or_default();
    let message = ["msg", "error_description", "message"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or("Authentication request rejected")
        .to_string();

    if status.is_client_error() {
        return AppError::bad_request(message, json!({ "status": status.as_u16() }));
    }

    tracing::error!(status = status.as_u16(), %message, "Identity provider error");
    AppError::upstream("Authentication service error", json!({ "status": status.as_u16() }))
}
