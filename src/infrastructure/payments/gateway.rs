//! Payment gateway trait and the payment model it reports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::AppError;

/// Payment state as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Ready,
    InProgress,
    WaitingForDeposit,
    Done,
    Canceled,
    PartialCanceled,
    Aborted,
    Expired,
}

impl GatewayPaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "READY" => Self::Ready,
            "IN_PROGRESS" => Self::InProgress,
            "WAITING_FOR_DEPOSIT" => Self::WaitingForDeposit,
            "DONE" => Self::Done,
            "CANCELED" => Self::Canceled,
            "PARTIAL_CANCELED" => Self::PartialCanceled,
            "ABORTED" => Self::Aborted,
            "EXPIRED" => Self::Expired,
            _ => return None,
        })
    }
}

/// A payment as returned by the gateway's confirm, lookup and cancel calls.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub payment_key: String,
    pub order_number: String,
    pub status: GatewayPaymentStatus,
    pub total_amount: i64,
    pub method: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Errors returned by a payment gateway client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway refused the request with its own error code.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// The request did not complete (connect failure, timeout, broken body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway answered with something we cannot interpret.
    #[error("unexpected gateway response ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

impl GatewayError {
    /// Only transport failures are retried; a rejection is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rejected { code, message } => {
                AppError::payment_failed(message, json!({ "gateway_code": code }))
            }
            other => {
                tracing::error!(error = %other, "Payment gateway failure");
                AppError::upstream("Payment gateway unavailable", json!({}))
            }
        }
    }
}

/// Server-to-server payment approval API.
///
/// Calls that change state send the order number or payment key as an
/// idempotency key, so retries never approve or cancel twice.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Approves an authorized payment for `amount`.
    async fn confirm(
        &self,
        payment_key: &str,
        order_number: &str,
        amount: i64,
    ) -> Result<GatewayPayment, GatewayError>;

    /// Reads the current state of a payment.
    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, GatewayError>;

    /// Cancels (refunds) an approved payment in full.
    async fn cancel(&self, payment_key: &str, reason: &str)
    -> Result<GatewayPayment, GatewayError>;
}
