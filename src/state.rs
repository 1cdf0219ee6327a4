//! Shared application state injected into every handler.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::{
    AuthService, CheckoutSettings, CurriculumService, EnrollmentService, OrderService,
    ProgramService, ProgressService, RoutineBlockService,
};
use crate::config::Config;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::identity::IdentityProvider;
use crate::infrastructure::payments::PaymentGateway;
use crate::infrastructure::storage::ObjectStorage;
use crate::infrastructure::persistence::{
    PgCurriculumRepository, PgEnrollmentRepository, PgOrderRepository, PgProfileRepository,
    PgProgramRepository, PgProgressRepository, PgRoutineBlockRepository,
};

pub type AppAuthService = AuthService<PgProfileRepository>;
pub type AppProgramService = ProgramService<PgProgramRepository, PgCurriculumRepository>;
pub type AppCurriculumService =
    CurriculumService<PgProgramRepository, PgCurriculumRepository, PgRoutineBlockRepository>;
pub type AppRoutineService = RoutineBlockService<PgRoutineBlockRepository>;
pub type AppOrderService =
    OrderService<PgOrderRepository, PgProgramRepository, PgEnrollmentRepository>;
pub type AppEnrollmentService =
    EnrollmentService<PgEnrollmentRepository, PgProgramRepository, PgProfileRepository>;
pub type AppProgressService =
    ProgressService<PgEnrollmentRepository, PgCurriculumRepository, PgProgressRepository>;

/// Settings the web layer needs outside of the services.
#[derive(Debug, Clone)]
pub struct WebSettings {
    /// Adds `Secure` to session cookies.
    pub cookie_secure: bool,
    /// Upper bound on multipart request bodies.
    pub max_upload_bytes: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AppAuthService>,
    pub program_service: Arc<AppProgramService>,
    pub curriculum_service: Arc<AppCurriculumService>,
    pub routine_service: Arc<AppRoutineService>,
    pub order_service: Arc<AppOrderService>,
    pub enrollment_service: Arc<AppEnrollmentService>,
    pub progress_service: Arc<AppProgressService>,
    pub cache: Arc<dyn CacheService>,
    pub web: WebSettings,
}

/// Clients for the services the application delegates to.
#[derive(Clone)]
pub struct Integrations {
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub gateway: Arc<dyn PaymentGateway>,
}

/// The subset of [`Config`] the services and handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub session_secret: String,
    pub session_cache_ttl_seconds: u64,
    pub currency: String,
    pub checkout: CheckoutSettings,
    pub web: WebSettings,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            session_secret: config.session_secret.clone(),
            session_cache_ttl_seconds: config.cache_ttl_seconds,
            currency: config.currency.clone(),
            checkout: CheckoutSettings {
                client_key: config.payment_client_key.clone(),
                public_base_url: config.public_base_url.clone(),
            },
            web: WebSettings {
                cookie_secure: config.cookie_secure,
                max_upload_bytes: config.max_upload_bytes,
            },
        }
    }
}

impl AppState {
    /// Wires the PostgreSQL repositories into the services.
    pub fn new(
        pool: Arc<PgPool>,
        cache: Arc<dyn CacheService>,
        integrations: Integrations,
        settings: Settings,
    ) -> Self {
        let profiles = Arc::new(PgProfileRepository::new(pool.clone()));
        let programs = Arc::new(PgProgramRepository::new(pool.clone()));
        let curriculum = Arc::new(PgCurriculumRepository::new(pool.clone()));
        let routines = Arc::new(PgRoutineBlockRepository::new(pool.clone()));
        let orders = Arc::new(PgOrderRepository::new(pool.clone()));
        let enrollments = Arc::new(PgEnrollmentRepository::new(pool.clone()));
        let progress = Arc::new(PgProgressRepository::new(pool));

        let auth_service = Arc::new(AuthService::new(
            profiles.clone(),
            integrations.identity,
            cache.clone(),
            settings.session_secret,
            settings.session_cache_ttl_seconds,
        ));
        let program_service = Arc::new(ProgramService::new(
            programs.clone(),
            curriculum.clone(),
            integrations.storage,
            settings.currency,
            settings.web.max_upload_bytes,
        ));
        let curriculum_service = Arc::new(CurriculumService::new(
            programs.clone(),
            curriculum.clone(),
            routines.clone(),
        ));
        let routine_service = Arc::new(RoutineBlockService::new(routines));
        let order_service = Arc::new(OrderService::new(
            orders,
            programs.clone(),
            enrollments.clone(),
            integrations.gateway,
            settings.checkout,
        ));
        let enrollment_service = Arc::new(EnrollmentService::new(
            enrollments.clone(),
            programs,
            profiles,
        ));
        let progress_service = Arc::new(ProgressService::new(enrollments, curriculum, progress));

        Self {
            auth_service,
            program_service,
            curriculum_service,
            routine_service,
            order_service,
            enrollment_service,
            progress_service,
            cache,
            web: settings.web,
        }
    }
}
