//! Sign-up, sign-in and session resolution against the identity provider.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{NewProfile, Profile};
use crate::domain::repositories::ProfileRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::identity::{IdentityProvider, IdentityUser, Session, SignUpOutcome};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(email(message = "Enter a valid e-mail address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 60, message = "Name must be 1 to 60 characters"))]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(email(message = "Enter a valid e-mail address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Enter your password"))]
    pub password: String,
}

/// Outcome of a successful sign-up.
#[derive(Debug, Clone)]
pub enum SignUpResult {
    SignedIn { session: Session, profile: Profile },
    ConfirmationRequired { email: String },
}

/// Service for authenticating users.
///
/// Credentials are checked by the external [`IdentityProvider`]; the local
/// [`Profile`] carries the role. Resolved access tokens are cached under an
/// HMAC-SHA256 of the token (keyed by `session_secret`), so the cache never
/// holds a usable credential.
pub struct AuthService<P: ProfileRepository> {
    profiles: Arc<P>,
    identity: Arc<dyn IdentityProvider>,
    cache: Arc<dyn CacheService>,
    session_secret: String,
    cache_ttl_seconds: u64,
}

impl<P: ProfileRepository> AuthService<P> {
    pub fn new(
        profiles: Arc<P>,
        identity: Arc<dyn IdentityProvider>,
        cache: Arc<dyn CacheService>,
        session_secret: String,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            profiles,
            identity,
            cache,
            session_secret,
            cache_ttl_seconds,
        }
    }

    /// Cache key for an access token: `session:<hex hmac>`.
    fn session_key(&self, access_token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.session_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(access_token.as_bytes());
        format!("session:{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Registers a new member.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for malformed input or an e-mail the
    /// provider refuses.
    pub async fn sign_up(&self, mut input: SignUpInput) -> Result<SignUpResult, AppError> {
        input.email = input.email.trim().to_lowercase();
        input.display_name = input.display_name.trim().to_string();
        input.validate()?;

        let outcome = self
            .identity
            .sign_up(&input.email, &input.password, &input.display_name)
            .await?;

        match outcome {
            SignUpOutcome::SignedIn(session) => {
                let profile = self
                    .ensure_profile(&session.user, Some(&input.display_name))
                    .await?;
                self.remember(&session.access_token, &profile.id).await;
                tracing::info!(user_id = %profile.id, "User signed up");
                Ok(SignUpResult::SignedIn { session, profile })
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                self.ensure_profile(&user, Some(&input.display_name))
                    .await?;
                tracing::info!(user_id = %user.id, "User signed up, awaiting confirmation");
                Ok(SignUpResult::ConfirmationRequired { email: user.email })
            }
        }
    }

    /// Password sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] for wrong credentials.
    pub async fn sign_in(&self, mut input: SignInInput) -> Result<(Session, Profile), AppError> {
        input.email = input.email.trim().to_lowercase();
        input.validate()?;

        let session = self.identity.sign_in(&input.email, &input.password).await?;
        let profile = self.ensure_profile(&session.user, None).await?;
        self.remember(&session.access_token, &profile.id).await;

        tracing::info!(user_id = %profile.id, "User signed in");
        Ok((session, profile))
    }

    /// Exchanges a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Session, Profile), AppError> {
        let session = self.identity.refresh(refresh_token).await?;
        let profile = self.ensure_profile(&session.user, None).await?;
        self.remember(&session.access_token, &profile.id).await;
        Ok((session, profile))
    }

    /// Resolves an access token to the caller's profile.
    ///
    /// A cache hit skips the provider round-trip; a miss asks the provider
    /// and caches the user id for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the provider rejects the token.
    pub async fn authenticate(&self, access_token: &str) -> Result<Profile, AppError> {
        let key = self.session_key(access_token);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                if let Ok(user_id) = Uuid::parse_str(&cached)
                    && let Some(profile) = self.profiles.find_by_id(&user_id).await?
                {
                    return Ok(profile);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session cache read failed"),
        }

        let user = self.identity.user(access_token).await?;
        let profile = match self.profiles.find_by_id(&user.id).await? {
            Some(profile) => profile,
            None => self.ensure_profile(&user, None).await?,
        };

        self.remember(access_token, &profile.id).await;
        Ok(profile)
    }

    /// Ends a session. Provider revocation is best effort.
    pub async fn sign_out(&self, access_token: &str) {
        let key = self.session_key(access_token);
        if let Err(e) = self.cache.invalidate(&key).await {
            tracing::warn!(error = %e, "Session cache invalidation failed");
        }
        if let Err(e) = self.identity.sign_out(access_token).await {
            tracing::warn!(error = %e, "Provider sign-out failed");
        }
    }

    async fn remember(&self, access_token: &str, user_id: &Uuid) {
        let key = self.session_key(access_token);
        if let Err(e) = self
            .cache
            .set(&key, &user_id.to_string(), Some(self.cache_ttl_seconds))
            .await
        {
            tracing::warn!(error = %e, "Session cache write failed");
        }
    }

    /// Creates the local profile on first sight of a provider user, keeping
    /// the e-mail in sync afterwards.
    async fn ensure_profile(
        &self,
        user: &IdentityUser,
        display_name: Option<&str>,
    ) -> Result<Profile, AppError> {
        let display_name = display_name
            .map(str::to_string)
            .or_else(|| user.display_name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_display_name(&user.email));

        if user.email.is_empty() {
            return Err(AppError::upstream(
                "Identity provider returned a user without e-mail",
                json!({ "user_id": user.id }),
            ));
        }

        self.profiles
            .upsert(NewProfile {
                id: user.id,
                email: user.email.clone(),
                display_name,
            })
            .await
    }
}

/// The local part of an e-mail address.
fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Role;
    use crate::domain::entities::fixtures::profile;
    use crate::domain::repositories::MockProfileRepository;
    use crate::infrastructure::cache::{CacheError, MockCacheService};
    use crate::infrastructure::identity::MockIdentityProvider;

    fn user(id: Uuid) -> IdentityUser {
        IdentityUser {
            id,
            email: "member@example.com".to_string(),
            display_name: None,
        }
    }

    fn session(id: Uuid) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            user: user(id),
        }
    }

    fn profile_for(new_profile: NewProfile) -> Profile {
        let mut p = profile(Role::Member);
        p.id = new_profile.id;
        p.email = new_profile.email;
        p.display_name = new_profile.display_name;
        p
    }

    fn quiet_cache() -> MockCacheService {
        let mut cache = MockCacheService::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().returning(|_, _, _| Ok(()));
        cache.expect_invalidate().returning(|_| Ok(()));
        cache
    }

    fn service(
        profiles: MockProfileRepository,
        identity: MockIdentityProvider,
        cache: MockCacheService,
    ) -> AuthService<MockProfileRepository> {
        AuthService::new(
            Arc::new(profiles),
            Arc::new(identity),
            Arc::new(cache),
            "test-secret".to_string(),
            300,
        )
    }

    #[tokio::test]
    async fn test_sign_up_creates_member_profile() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .withf(|email, _, name| email == "new@example.com" && name == "Jamie")
            .times(1)
            .returning(move |_, _, _| Ok(SignUpOutcome::SignedIn(session(id))));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_upsert()
            .withf(move |p| p.id == id && p.display_name == "Jamie")
            .times(1)
            .returning(|p| Ok(profile_for(p)));

        let result = service(profiles, identity, quiet_cache())
            .sign_up(SignUpInput {
                email: " New@Example.com ".to_string(),
                password: "long-enough".to_string(),
                display_name: " Jamie ".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(result, SignUpResult::SignedIn { .. }));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let identity = MockIdentityProvider::new();
        let profiles = MockProfileRepository::new();

        let result = service(profiles, identity, quiet_cache())
            .sign_up(SignUpInput {
                email: "new@example.com".to_string(),
                password: "short".to_string(),
                display_name: "Jamie".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_sign_up_awaiting_confirmation() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .returning(move |_, _, _| Ok(SignUpOutcome::ConfirmationRequired(user(id))));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_upsert()
            .times(1)
            .returning(|p| Ok(profile_for(p)));

        let result = service(profiles, identity, quiet_cache())
            .sign_up(SignUpInput {
                email: "member@example.com".to_string(),
                password: "long-enough".to_string(),
                display_name: "Jamie".to_string(),
            })
            .await
            .unwrap();

        match result {
            SignUpResult::ConfirmationRequired { email } => {
                assert_eq!(email, "member@example.com")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_is_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in()
            .returning(|_, _| Err(AppError::unauthorized("Invalid credentials", json!({}))));

        let result = service(MockProfileRepository::new(), identity, quiet_cache())
            .sign_in(SignInInput {
                email: "member@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_uses_cached_user_id() {
        let member = profile(Role::Member);
        let member_id = member.id;

        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .withf(|key| key.starts_with("session:") && key.len() == "session:".len() + 64)
            .times(1)
            .returning(move |_| Ok(Some(member_id.to_string())));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(member.clone())));

        let mut identity = MockIdentityProvider::new();
        identity.expect_user().times(0);

        let resolved = service(profiles, identity, cache)
            .authenticate("token")
            .await
            .unwrap();
        assert_eq!(resolved.id, member_id);
    }

    #[tokio::test]
    async fn test_authenticate_cache_miss_asks_provider_and_caches() {
        let id = Uuid::new_v4();

        let mut cache = MockCacheService::new();
        cache.expect_get().returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(move |_, value, ttl| value == id.to_string() && *ttl == Some(300))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut identity = MockIdentityProvider::new();
        identity.expect_user().times(1).returning(move |_| Ok(user(id)));

        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_id().returning(|_| Ok(None));
        profiles
            .expect_upsert()
            .times(1)
            .returning(|p| Ok(profile_for(p)));

        let resolved = service(profiles, identity, cache)
            .authenticate("token")
            .await
            .unwrap();
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.display_name, "member");
    }

    #[tokio::test]
    async fn test_authenticate_survives_cache_outage() {
        let id = Uuid::new_v4();

        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .returning(|_| Err(CacheError::ConnectionError("down".into())));
        cache
            .expect_set()
            .returning(|_, _, _| Err(CacheError::ConnectionError("down".into())));

        let mut identity = MockIdentityProvider::new();
        identity.expect_user().returning(move |_| Ok(user(id)));

        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_id().returning(move |_| {
            let mut p = profile(Role::Coach);
            p.id = id;
            Ok(Some(p))
        });

        let resolved = service(profiles, identity, cache)
            .authenticate("token")
            .await
            .unwrap();
        assert_eq!(resolved.role, Role::Coach);
    }

    #[tokio::test]
    async fn test_sign_out_ignores_provider_failure() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_out()
            .times(1)
            .returning(|_| Err(AppError::upstream("down", json!({}))));

        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(1).returning(|_| Ok(()));

        service(MockProfileRepository::new(), identity, cache)
            .sign_out("token")
            .await;
    }

    #[test]
    fn test_session_key_is_stable_and_secret_bound() {
        let a = service(
            MockProfileRepository::new(),
            MockIdentityProvider::new(),
            MockCacheService::new(),
        );
        let b = AuthService::new(
            Arc::new(MockProfileRepository::new()),
            Arc::new(MockIdentityProvider::new()),
            Arc::new(MockCacheService::new()),
            "other-secret".to_string(),
            300,
        );

        assert_eq!(a.session_key("t"), a.session_key("t"));
        assert_ne!(a.session_key("t"), a.session_key("u"));
        assert_ne!(a.session_key("t"), b.session_key("t"));
    }

    #[test]
    fn test_default_display_name() {
        assert_eq!(default_display_name("jamie@example.com"), "jamie");
        assert_eq!(default_display_name("odd"), "odd");
    }
}
