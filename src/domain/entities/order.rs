//! Order entity: a purchase of a program and its payment state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Payment method recorded for orders that never reach the gateway.
pub const FREE_PAYMENT_METHOD: &str = "free";

/// Payment state of an order.
///
/// ```text
/// pending ──▶ paid ──▶ refunded
///    │
///    ├──▶ failed
///    └──▶ canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Canceled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Returns true if an order may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Failed | OrderStatus::Canceled | OrderStatus::Refunded
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            "canceled" => Ok(OrderStatus::Canceled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(AppError::bad_request(
                "Unknown order status",
                json!({ "status": other }),
            )),
        }
    }
}

/// A purchase record linking a buyer, a program and payment status.
///
/// `order_number` is the identifier shared with the payment gateway.
/// `program_title` is filled when the order is loaded together with its program.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub buyer_id: Uuid,
    pub program_id: i64,
    pub program_title: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_key: Option<String>,
    pub payment_method: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    /// Returns true if the order was settled without the payment gateway.
    pub fn is_free(&self) -> bool {
        self.payment_method.as_deref() == Some(FREE_PAYMENT_METHOD)
    }
}

/// Input for creating a pending order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub buyer_id: Uuid,
    pub program_id: i64,
    pub amount: i64,
    pub currency: String,
}

/// Result of a successful payment approval, as reported by the gateway.
#[derive(Debug, Clone)]
pub struct PaymentApproval {
    pub payment_key: Option<String>,
    pub method: String,
    pub approved_at: DateTime<Utc>,
}

impl PaymentApproval {
    /// Approval for a zero-amount order that skips the gateway.
    pub fn free(now: DateTime<Utc>) -> Self {
        Self {
            payment_key: None,
            method: FREE_PAYMENT_METHOD.to_string(),
            approved_at: now,
        }
    }
}
