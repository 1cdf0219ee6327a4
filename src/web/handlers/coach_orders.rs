//! Coach area: sales ledger and refunds.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, Query, State};
use axum::response::Redirect;
use serde::Deserialize;
use serde_json::json;

use crate::api::dto::pagination::PaginationParams;
use crate::domain::entities::Order;
use crate::error::AppError;
use crate::state::AppState;
use crate::web::error::WebError;
use crate::web::middleware::web_auth::CoachUser;
use crate::web::views::{Nav, Pager, format_datetime, money};

const ORDERS_PAGE_SIZE: i64 = 25;

pub struct SaleRow {
    id: i64,
    order_number: String,
    program_title: String,
    amount: String,
    status: &'static str,
    created: String,
    refundable: bool,
    refund_reason: Option<String>,
}

impl From<Order> for SaleRow {
    fn from(order: Order) -> Self {
        Self {
            refundable: order.is_paid(),
            amount: money(order.amount, &order.currency),
            status: order.status.as_str(),
            created: format_datetime(order.created_at),
            program_title: order
                .program_title
                .unwrap_or_else(|| format!("Program #{}", order.program_id)),
            id: order.id,
            order_number: order.order_number,
            refund_reason: order.refund_reason,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coach/orders.html")]
pub struct CoachOrdersTemplate {
    nav: Nav,
    orders: Vec<SaleRow>,
    pager: Pager,
}

/// Lists orders for the coach's programs, newest first.
///
/// # Endpoint
///
/// `GET /coach/orders?page=N`
pub async fn coach_orders_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Query(params): Query<PaginationParams>,
) -> Result<CoachOrdersTemplate, WebError> {
    let (page, page_size) = params
        .resolve(ORDERS_PAGE_SIZE, ORDERS_PAGE_SIZE)
        .map_err(|msg| AppError::bad_request(msg, json!({})))?;

    let orders = st
        .order_service
        .orders_for_coach(&coach, page, page_size)
        .await?;

    Ok(CoachOrdersTemplate {
        nav: Nav::for_viewer(Some(&coach)),
        pager: Pager::new(&orders),
        orders: orders.items.into_iter().map(SaleRow::from).collect(),
    })
}

#[derive(Debug, Deserialize)]
pub struct RefundForm {
    #[serde(default)]
    reason: String,
}

/// Refunds a paid order in full and revokes the access it granted.
///
/// # Endpoint
///
/// `POST /coach/orders/{id}/refund`
pub async fn refund_handler(
    State(st): State<AppState>,
    CoachUser(coach): CoachUser,
    Path(order_id): Path<i64>,
    Form(form): Form<RefundForm>,
) -> Result<Redirect, WebError> {
    st.order_service
        .refund(&coach, order_id, &form.reason)
        .await?;
    Ok(Redirect::to("/coach/orders"))
}
