//! Handler for payment gateway webhooks.

use axum::{Json, extract::State};

use crate::api::dto::webhook::{WebhookAck, WebhookEvent};
use crate::error::AppError;
use crate::state::AppState;

/// Reconciles an order with the gateway after a payment status change.
///
/// # Endpoint
///
/// `POST /api/payments/webhook`
///
/// Events without a payment key and payments matching no order are
/// acknowledged and ignored. Gateway and database failures return an error
/// status so the gateway redelivers the event.
pub async fn payment_webhook_handler(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<WebhookAck>, AppError> {
    let Some(payment_key) = event.data.payment_key.filter(|k| !k.trim().is_empty()) else {
        tracing::debug!(event_type = ?event.event_type, "Webhook without payment key ignored");
        return Ok(Json(WebhookAck {
            received: true,
            order_status: None,
        }));
    };

    let order = state.order_service.reconcile(&payment_key).await?;

    Ok(Json(WebhookAck {
        received: true,
        order_status: order.map(|o| o.status),
    }))
}
