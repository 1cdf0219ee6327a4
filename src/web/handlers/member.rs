//! Member pages: enrolled programs and order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chrono::Utc;

use crate::domain::entities::{EnrollmentOverview, EnrollmentStatus, Order, completion_percent};
use crate::state::AppState;
use crate::web::error::WebError;
use crate::web::middleware::web_auth::CurrentUser;
use crate::web::views::{Nav, access_until, format_datetime, money};

pub struct EnrollmentCard {
    slug: String,
    title: String,
    thumbnail_url: Option<String>,
    active: bool,
    status_label: String,
    completed_days: i64,
    total_days: i64,
    percent: i64,
}

impl From<EnrollmentOverview> for EnrollmentCard {
    fn from(overview: EnrollmentOverview) -> Self {
        let enrollment = &overview.enrollment;
        let active = enrollment.is_active_at(Utc::now());
        let status_label = match (active, enrollment.status) {
            (true, _) if enrollment.is_lifetime() => "Lifetime access".to_string(),
            (true, _) => format!("Access {}", access_until(enrollment.expires_at)),
            (false, EnrollmentStatus::Canceled) => "Canceled".to_string(),
            (false, _) => "Access expired".to_string(),
        };

        Self {
            percent: completion_percent(overview.completed_days, overview.total_days),
            slug: overview.program_slug,
            title: overview.program_title,
            thumbnail_url: overview.thumbnail_url,
            active,
            status_label,
            completed_days: overview.completed_days,
            total_days: overview.total_days,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    nav: Nav,
    greeting: String,
    enrollments: Vec<EnrollmentCard>,
}

/// Renders the member's programs with their progress.
///
/// # Endpoint
///
/// `GET /dashboard`
pub async fn dashboard_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<DashboardTemplate, WebError> {
    let enrollments = st.enrollment_service.my_enrollments(&user).await?;

    Ok(DashboardTemplate {
        nav: Nav::for_viewer(Some(&user)),
        greeting: format!("Welcome back, {}", user.display_name),
        enrollments: enrollments.into_iter().map(EnrollmentCard::from).collect(),
    })
}

pub struct OrderRow {
    order_number: String,
    program_title: String,
    amount: String,
    status: &'static str,
    created: String,
    failure: Option<String>,
}

impl From<Order> for OrderRow {
    fn from(order: Order) -> Self {
        Self {
            amount: money(order.amount, &order.currency),
            status: order.status.as_str(),
            created: format_datetime(order.created_at),
            failure: order.failure_message,
            program_title: order
                .program_title
                .unwrap_or_else(|| format!("Program #{}", order.program_id)),
            order_number: order.order_number,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    nav: Nav,
    orders: Vec<OrderRow>,
}

/// Renders the member's order history.
///
/// # Endpoint
///
/// `GET /orders`
pub async fn orders_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<OrdersTemplate, WebError> {
    let orders = st.order_service.orders_for_buyer(&user).await?;

    Ok(OrdersTemplate {
        nav: Nav::for_viewer(Some(&user)),
        orders: orders.into_iter().map(OrderRow::from).collect(),
    })
}
