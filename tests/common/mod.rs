#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coach_programs::application::services::CheckoutSettings;
use coach_programs::error::AppError;
use coach_programs::infrastructure::cache::NullCache;
use coach_programs::infrastructure::identity::{
    IdentityProvider, IdentityUser, Session, SignUpOutcome,
};
use coach_programs::infrastructure::payments::{
    GatewayError, GatewayPayment, GatewayPaymentStatus, PaymentGateway,
};
use coach_programs::infrastructure::storage::ObjectStorage;
use coach_programs::state::{AppState, Integrations, Settings, WebSettings};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse";
pub const STORAGE_BASE: &str = "https://storage.test/public/";

/// Identity provider that trusts tokens of the form `test:{user id}:{email}`.
pub struct FakeIdentity;

pub fn access_token(user_id: &Uuid, email: &str) -> String {
    format!("test:{user_id}:{email}")
}

fn user_from_token(token: &str) -> Option<IdentityUser> {
    let rest = token.strip_prefix("test:")?;
    let (id, email) = rest.split_once(':')?;
    Some(IdentityUser {
        id: Uuid::parse_str(id).ok()?,
        email: email.to_string(),
        display_name: None,
    })
}

fn session_for(user: IdentityUser) -> Session {
    Session {
        access_token: access_token(&user.id, &user.email),
        refresh_token: format!("refresh:{}", user.id),
        expires_in: 3600,
        user,
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AppError> {
        Ok(SignUpOutcome::SignedIn(session_for(IdentityUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: Some(display_name.to_string()),
        })))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        if password != TEST_PASSWORD {
            return Err(AppError::unauthorized(
                "Invalid e-mail or password",
                json!({}),
            ));
        }
        Ok(session_for(IdentityUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: None,
        }))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AppError> {
        Err(AppError::unauthorized("Refresh token rejected", json!({})))
    }

    async fn user(&self, access_token: &str) -> Result<IdentityUser, AppError> {
        user_from_token(access_token)
            .ok_or_else(|| AppError::unauthorized("Invalid access token", json!({})))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Object storage that only builds URLs.
pub struct FakeStorage;

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        path: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        Ok(format!("{STORAGE_BASE}{path}"))
    }

    async fn remove(&self, _path: &str) -> Result<(), AppError> {
        Ok(())
    }

    fn path_of(&self, public_url: &str) -> Option<String> {
        public_url.strip_prefix(STORAGE_BASE).map(str::to_string)
    }
}

/// In-memory payment gateway. Confirmations always succeed.
#[derive(Default)]
pub struct FakeGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
}

impl FakeGateway {
    /// Registers a payment as the gateway would report it.
    pub fn insert(&self, payment: GatewayPayment) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.payment_key.clone(), payment);
    }
}

pub fn gateway_payment(
    payment_key: &str,
    order_number: &str,
    amount: i64,
    status: GatewayPaymentStatus,
) -> GatewayPayment {
    GatewayPayment {
        payment_key: payment_key.to_string(),
        order_number: order_number.to_string(),
        status,
        total_amount: amount,
        method: Some("CARD".to_string()),
        approved_at: Some(Utc::now()),
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn confirm(
        &self,
        payment_key: &str,
        order_number: &str,
        amount: i64,
    ) -> Result<GatewayPayment, GatewayError> {
        let payment = gateway_payment(payment_key, order_number, amount, GatewayPaymentStatus::Done);
        self.insert(payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, GatewayError> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_key)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                code: "NOT_FOUND_PAYMENT".to_string(),
                message: "Payment not found".to_string(),
            })
    }

    async fn cancel(
        &self,
        payment_key: &str,
        _reason: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(payment_key)
            .ok_or_else(|| GatewayError::Rejected {
                code: "NOT_FOUND_PAYMENT".to_string(),
                message: "Payment not found".to_string(),
            })?;
        payment.status = GatewayPaymentStatus::Canceled;
        Ok(payment.clone())
    }
}

pub fn test_settings() -> Settings {
    Settings {
        session_secret: "test-session-secret".to_string(),
        session_cache_ttl_seconds: 60,
        currency: "KRW".to_string(),
        checkout: CheckoutSettings {
            client_key: "test_ck_client".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
        },
        web: WebSettings {
            cookie_secure: false,
            max_upload_bytes: 1024 * 1024,
        },
    }
}

pub fn create_test_state(pool: PgPool) -> (AppState, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::default());

    let state = AppState::new(
        Arc::new(pool),
        Arc::new(NullCache::new()),
        Integrations {
            identity: Arc::new(FakeIdentity),
            storage: Arc::new(FakeStorage),
            gateway: gateway.clone(),
        },
        test_settings(),
    );

    (state, gateway)
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub async fn create_profile(pool: &PgPool, email: &str, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, email, display_name, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(email)
        .bind(email.split('@').next().unwrap_or(email))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn create_program(
    pool: &PgPool,
    coach_id: Uuid,
    slug: &str,
    price: i64,
    access_days: Option<i32>,
    status: &str,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO programs (coach_id, slug, title, description, price, currency, access_days, status, published_at)
        VALUES ($1, $2, $3, '', $4, 'KRW', $5, $6, CASE WHEN $6 = 'published' THEN now() END)
        RETURNING id
        "#,
    )
    .bind(coach_id)
    .bind(slug)
    .bind(format!("Program {slug}"))
    .bind(price)
    .bind(access_days)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_day(pool: &PgPool, program_id: i64, day_number: i32, title: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO blueprints (program_id, day_number, title) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(program_id)
    .bind(day_number)
    .bind(title)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_enrollment(
    pool: &PgPool,
    user_id: Uuid,
    program_id: i64,
    expires_at: Option<DateTime<Utc>>,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO enrollments (user_id, program_id, status, starts_at, expires_at)
        VALUES ($1, $2, 'active', now(), $3)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(program_id)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_paid_order(
    pool: &PgPool,
    buyer_id: Uuid,
    program_id: i64,
    order_number: &str,
    amount: i64,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO orders (order_number, buyer_id, program_id, amount, currency, status, payment_key, payment_method, approved_at)
        VALUES ($1, $2, $3, $4, 'KRW', 'paid', $5, 'CARD', now())
        RETURNING id
        "#,
    )
    .bind(order_number)
    .bind(buyer_id)
    .bind(program_id)
    .bind(amount)
    .bind(format!("pay_{order_number}"))
    .fetch_one(pool)
    .await
    .unwrap()
}

/// `Cookie` header value carrying a web session for the user.
pub fn session_cookie(user_id: &Uuid, email: &str) -> String {
    format!("cp_access={}", access_token(user_id, email))
}

/// `Authorization` header value for the JSON API.
pub fn bearer(user_id: &Uuid, email: &str) -> String {
    format!("Bearer {}", access_token(user_id, email))
}
