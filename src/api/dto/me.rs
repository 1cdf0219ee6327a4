//! DTOs for the authenticated user's own resources.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{
    EnrollmentOverview, EnrollmentStatus, Order, OrderStatus, Profile, Role, completion_percent,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentItem {
    pub program_slug: String,
    pub program_title: String,
    pub status: EnrollmentStatus,
    pub starts_at: DateTime<Utc>,
    /// `null` for lifetime access.
    pub expires_at: Option<DateTime<Utc>>,
    pub completed_days: i64,
    pub total_days: i64,
    pub percent: i64,
}

impl From<EnrollmentOverview> for EnrollmentItem {
    fn from(overview: EnrollmentOverview) -> Self {
        Self {
            program_slug: overview.program_slug,
            program_title: overview.program_title,
            status: overview.enrollment.status,
            starts_at: overview.enrollment.starts_at,
            expires_at: overview.enrollment.expires_at,
            completed_days: overview.completed_days,
            total_days: overview.total_days,
            percent: completion_percent(overview.completed_days, overview.total_days),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItem {
    pub order_number: String,
    pub program_title: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_method: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderItem {
    fn from(order: Order) -> Self {
        Self {
            order_number: order.order_number,
            program_title: order.program_title,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            payment_method: order.payment_method,
            approved_at: order.approved_at,
            refunded_at: order.refunded_at,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}
