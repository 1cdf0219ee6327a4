//! Web page route configuration.
//!
//! Every group is wrapped in [`crate::web::middleware::web_auth::layer`] by
//! the top-level router; pages that need a user enforce it with extractors.

use crate::state::AppState;
use crate::web::handlers::*;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};

/// Multipart framing on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Pages open to guests.
///
/// # Endpoints
///
/// - `GET /`                  - Catalog (paginated)
/// - `GET /programs/{slug}`   - Program sales page
/// - `GET /login`, `/signup`  - Account forms
/// - `POST /logout`           - Sign out
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog_handler))
        .route("/programs/{slug}", get(program_page_handler))
        .route("/login", get(login_page_handler))
        .route("/signup", get(signup_page_handler))
        .route("/logout", post(logout_handler))
}

/// Credential and payment submissions, rate limited more strictly.
///
/// # Endpoints
///
/// - `POST /login`
/// - `POST /signup`
/// - `POST /programs/{slug}/checkout`
pub fn sensitive_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/signup", post(signup_handler))
        .route("/programs/{slug}/checkout", post(checkout_handler))
}

/// Pages for signed-in members.
///
/// # Endpoints
///
/// - `GET /dashboard`                       - Enrolled programs
/// - `GET /orders`                          - Order history
/// - `GET /payments/success`, `/payments/fail` - Gateway return URLs
/// - `GET /learn/{slug}`                    - Plan by week
/// - `GET /learn/{slug}/days/{day}`         - One day
/// - `POST /learn/{slug}/days/{day}/complete|reset`
pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/orders", get(orders_handler))
        .route("/payments/success", get(payment_success_handler))
        .route("/payments/fail", get(payment_fail_handler))
        .route("/learn/{slug}", get(plan_handler))
        .route("/learn/{slug}/days/{day}", get(day_handler))
        .route("/learn/{slug}/days/{day}/complete", post(complete_day_handler))
        .route("/learn/{slug}/days/{day}/reset", post(reset_day_handler))
}

/// The coach area.
///
/// `max_upload_bytes` bounds the thumbnail upload body.
pub fn coach_routes(max_upload_bytes: usize) -> Router<AppState> {
    let upload = Router::new()
        .route(
            "/coach/programs/{id}/thumbnail",
            post(upload_thumbnail_handler),
        )
        .layer(DefaultBodyLimit::max(
            max_upload_bytes + UPLOAD_OVERHEAD_BYTES,
        ));

    Router::new()
        .route("/coach", get(coach_overview_handler))
        .route("/coach/programs", post(create_program_handler))
        .route("/coach/programs/new", get(new_program_handler))
        .route("/coach/programs/{id}", post(update_program_handler))
        .route("/coach/programs/{id}/edit", get(edit_program_handler))
        .route("/coach/programs/{id}/publish", post(publish_program_handler))
        .route(
            "/coach/programs/{id}/unpublish",
            post(unpublish_program_handler),
        )
        .route("/coach/programs/{id}/archive", post(archive_program_handler))
        .route("/coach/programs/{id}/delete", post(delete_program_handler))
        .route("/coach/programs/{id}/members", get(members_handler))
        .route(
            "/coach/programs/{id}/curriculum",
            get(curriculum_handler),
        )
        .route("/coach/programs/{id}/days", post(add_day_handler))
        .route(
            "/coach/days/{id}",
            get(day_editor_handler).post(update_day_handler),
        )
        .route("/coach/days/{id}/delete", post(delete_day_handler))
        .route("/coach/days/{id}/copy", post(copy_day_handler))
        .route("/coach/days/{id}/sections", post(add_section_handler))
        .route("/coach/sections/{id}", post(update_section_handler))
        .route("/coach/sections/{id}/delete", post(delete_section_handler))
        .route("/coach/sections/{id}/move", post(move_section_handler))
        .route(
            "/coach/routines",
            get(routines_handler).post(create_routine_handler),
        )
        .route(
            "/coach/routines/{id}",
            get(routine_handler).post(update_routine_handler),
        )
        .route("/coach/routines/{id}/delete", post(delete_routine_handler))
        .route(
            "/coach/routines/{id}/exercises",
            post(add_exercise_handler),
        )
        .route(
            "/coach/routines/{id}/exercises/{exercise_id}/delete",
            post(remove_exercise_handler),
        )
        .route("/coach/orders", get(coach_orders_handler))
        .route("/coach/orders/{id}/refund", post(refund_handler))
        .merge(upload)
}
