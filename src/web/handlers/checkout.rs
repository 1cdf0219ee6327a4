//! Checkout and the payment gateway's return pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::application::services::{CheckoutSession, CheckoutStart};
use crate::error::AppError;
use crate::state::AppState;
use crate::web::error::{WebError, form_message};
use crate::web::middleware::web_auth::CurrentUser;
use crate::web::views::{Nav, money};

#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    nav: Nav,
    session: CheckoutSession,
    amount_label: String,
}

/// Starts buying a program.
///
/// Free programs are granted immediately and the member lands on the plan.
/// Paid programs render the gateway's payment widget.
///
/// # Endpoint
///
/// `POST /programs/{slug}/checkout`
pub async fn checkout_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    match st.order_service.start_checkout(&user, &slug).await? {
        CheckoutStart::Free(_) => Ok(Redirect::to(&format!("/learn/{}", slug)).into_response()),
        CheckoutStart::Checkout(session) => Ok(CheckoutTemplate {
            nav: Nav::for_viewer(Some(&user)),
            amount_label: money(session.amount, &session.currency),
            session,
        }
        .into_response()),
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "payment_result.html")]
pub struct PaymentResultTemplate {
    nav: Nav,
    success: bool,
    title: String,
    message: String,
    link_href: String,
    link_label: String,
}

impl PaymentResultTemplate {
    fn failed(nav: Nav, message: String) -> Self {
        Self {
            nav,
            success: false,
            title: "Payment was not completed".to_string(),
            message,
            link_href: "/orders".to_string(),
            link_label: "View your orders".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessQuery {
    payment_key: String,
    order_id: String,
    amount: i64,
}

/// Confirms the payment the gateway redirected back with.
///
/// Declines and tampered amounts render a failure page; the order is
/// already marked failed by then.
///
/// # Endpoint
///
/// `GET /payments/success?paymentKey=..&orderId=..&amount=..`
pub async fn payment_success_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SuccessQuery>,
) -> Result<Response, WebError> {
    let nav = Nav::for_viewer(Some(&user));

    let order = match st
        .order_service
        .confirm_payment(&user, &query.order_id, &query.payment_key, query.amount)
        .await
    {
        Ok(order) => order,
        Err(e @ (AppError::PaymentFailed { .. } | AppError::Validation { .. })) => {
            let status = e.status();
            let page = PaymentResultTemplate::failed(nav, form_message(&e));
            return Ok((status, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let program = st.program_service.get(order.program_id).await?;

    Ok(PaymentResultTemplate {
        nav,
        success: true,
        title: "Payment complete".to_string(),
        message: format!(
            "You now have access to {}. Order {}.",
            program.title, order.order_number
        ),
        link_href: format!("/learn/{}", program.slug),
        link_label: "Start training".to_string(),
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
}

/// Records a failure reported by the gateway and explains it.
///
/// # Endpoint
///
/// `GET /payments/fail?code=..&message=..&orderId=..`
pub async fn payment_fail_handler(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<FailQuery>,
) -> Result<PaymentResultTemplate, WebError> {
    let code = query.code.unwrap_or_else(|| "UNKNOWN".to_string());
    let message = query
        .message
        .unwrap_or_else(|| "The payment was canceled or declined.".to_string());

    if let Some(order_number) = &query.order_id {
        st.order_service
            .fail_payment(&user, order_number, &code, &message)
            .await?;
    }

    tracing::info!(user_id = %user.id, code = %code, "Payment failed at gateway");
    Ok(PaymentResultTemplate::failed(
        Nav::for_viewer(Some(&user)),
        message,
    ))
}
