//! API route configuration.

use crate::api::handlers::{
    me_handler, my_enrollments_handler, my_orders_handler, payment_webhook_handler,
    program_detail_handler, program_list_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Public catalog routes.
///
/// # Endpoints
///
/// - `GET /programs`        - Published programs (paginated)
/// - `GET /programs/{slug}` - Program detail with day outline
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/programs", get(program_list_handler))
        .route("/programs/{slug}", get(program_detail_handler))
}

/// Routes protected by Bearer token authentication.
///
/// # Endpoints
///
/// - `GET /me`             - Caller's profile
/// - `GET /me/enrollments` - Caller's enrollments with progress
/// - `GET /me/orders`      - Caller's orders
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me_handler))
        .route("/me/enrollments", get(my_enrollments_handler))
        .route("/me/orders", get(my_orders_handler))
}

/// Server-to-server callbacks from the payment gateway.
///
/// - `POST /payments/webhook` - Payment status change notification
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/payments/webhook", post(payment_webhook_handler))
}
