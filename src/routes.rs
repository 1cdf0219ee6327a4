//! Top-level router configuration combining API and web routes.
//!
//! # Route Structure
//!
//! - `GET  /health`      - Health check: DB, cache (public)
//! - `/api/*`            - JSON API (catalog public, `/api/me*` needs a Bearer token)
//! - `POST /api/payments/webhook` - Payment gateway notifications
//! - `/`, `/programs/*`, `/learn/*`, `/coach/*`, ... - Web pages (cookie session)
//! - `/static/*`         - Static assets
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)
//! - **Authentication** - Bearer token (API) or cookie session (web)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{auth, rate_limit, tracing};
use crate::state::AppState;
use crate::web;
use crate::web::middleware::web_auth;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
pub fn app_router(state: AppState, behind_proxy: bool) -> NormalizePath<Router> {
    let api_protected = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    let api_router = Router::new()
        .merge(api::routes::public_routes())
        .merge(api_protected)
        .merge(api::routes::webhook_routes())
        .layer(rate_limit::layer(behind_proxy));

    let web_router = Router::new()
        .merge(web::routes::public_routes())
        .merge(web::routes::member_routes())
        .merge(web::routes::coach_routes(state.web.max_upload_bytes))
        .layer(rate_limit::layer(behind_proxy))
        .merge(web::routes::sensitive_routes().layer(rate_limit::secure_layer(behind_proxy)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            web_auth::layer,
        ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .merge(web_router)
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
