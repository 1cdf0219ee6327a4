//! Identity provider trait and the types it exchanges.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

/// A user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

/// Tokens issued by the identity provider for a signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: IdentityUser,
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is usable immediately.
    SignedIn(Session),
    /// The provider sent a confirmation e-mail; no session yet.
    ConfirmationRequired(IdentityUser),
}

/// External authentication and user store.
///
/// Passwords never reach the application database; they are only forwarded
/// to the provider.
///
/// # Errors
///
/// Implementations return [`AppError::Unauthorized`] for rejected credentials
/// or tokens, [`AppError::Validation`] for input the provider refuses and
/// [`AppError::Upstream`] when the provider is unreachable or misbehaves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AppError>;

    /// Password grant.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;

    /// Refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError>;

    /// Resolves the user behind an access token.
    async fn user(&self, access_token: &str) -> Result<IdentityUser, AppError>;

    /// Revokes the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
}
