//! Handlers for the authenticated user's own resources.
//!
//! The bearer middleware resolves the caller and stores the [`Profile`] as a
//! request extension.

use axum::{Extension, Json, extract::State};

use crate::api::dto::me::{EnrollmentItem, ListResponse, OrderItem, ProfileResponse};
use crate::domain::entities::Profile;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/me`
pub async fn me_handler(Extension(profile): Extension<Profile>) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(profile))
}

/// `GET /api/me/enrollments`
pub async fn my_enrollments_handler(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<ListResponse<EnrollmentItem>>, AppError> {
    let enrollments = state.enrollment_service.my_enrollments(&profile).await?;
    Ok(Json(ListResponse {
        items: enrollments.into_iter().map(EnrollmentItem::from).collect(),
    }))
}

/// `GET /api/me/orders`
pub async fn my_orders_handler(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<ListResponse<OrderItem>>, AppError> {
    let orders = state.order_service.orders_for_buyer(&profile).await?;
    Ok(Json(ListResponse {
        items: orders.into_iter().map(OrderItem::from).collect(),
    }))
}
