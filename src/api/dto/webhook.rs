//! DTOs for payment gateway webhooks.

use serde::{Deserialize, Serialize};

use crate::domain::entities::OrderStatus;

/// Webhook envelope sent by the payment gateway.
///
/// Only the payment key is read; the payment itself is fetched again from
/// the gateway before anything changes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default)]
    pub event_type: Option<String>,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    #[serde(default)]
    pub payment_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
}
