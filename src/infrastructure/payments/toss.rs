//! Payment gateway client for the Toss Payments v1 REST API.

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use url::Url;

use super::gateway::{GatewayError, GatewayPayment, GatewayPaymentStatus, PaymentGateway};

const MAX_RETRIES: usize = 3;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    payment_key: String,
    order_id: String,
    status: String,
    total_amount: i64,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    approved_at: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl TryFrom<PaymentBody> for GatewayPayment {
    type Error = GatewayError;

    fn try_from(body: PaymentBody) -> Result<Self, Self::Error> {
        let status =
            GatewayPaymentStatus::parse(&body.status).ok_or_else(|| GatewayError::Unexpected {
                status: 200,
                body: format!("unknown payment status {}", body.status),
            })?;

        Ok(GatewayPayment {
            payment_key: body.payment_key,
            order_number: body.order_id,
            status,
            total_amount: body.total_amount,
            method: body.method,
            approved_at: body.approved_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

/// Toss Payments client authenticating with HTTP Basic (`secret_key:`).
pub struct TossPayments {
    http: Client,
    base_url: String,
    authorization: String,
}

impl TossPayments {
    /// `base_url` is the API root, e.g. `https://api.tosspayments.com`.
    pub fn new(http: Client, base_url: &str, secret_key: &str) -> Self {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", secret_key));

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", credentials),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/v1/payments/{payment_key}[/{action}]` with the key encoded as a
    /// single path segment.
    fn payment_url(&self, payment_key: &str, action: Option<&str>) -> Result<String, GatewayError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Transport(format!("invalid gateway URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("invalid gateway URL".to_string()))?
            .pop_if_empty()
            .extend(["v1", "payments", payment_key])
            .extend(action);
        Ok(url.into())
    }

    /// Sends a request built by `build`, retrying transport failures with
    /// exponential backoff.
    async fn execute<F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> Result<GatewayPayment, GatewayError>
    where
        F: Fn() -> RequestBuilder + Sync,
    {
        let strategy = ExponentialBackoff::from_millis(10)
            .factor(20)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(MAX_RETRIES);

        let build = &build;
        let authorization = self.authorization.as_str();

        RetryIf::start(
            strategy,
            move || async move {
                let response = build()
                    .header(reqwest::header::AUTHORIZATION, authorization)
                    .send()
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;

                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;

                if status.is_success() {
                    let payment: PaymentBody =
                        serde_json::from_str(&body).map_err(|_| GatewayError::Unexpected {
                            status: status.as_u16(),
                            body: body.clone(),
                        })?;
                    return GatewayPayment::try_from(payment);
                }

                match serde_json::from_str::<ErrorBody>(&body) {
                    Ok(err) if status.is_client_error() => Err(GatewayError::Rejected {
                        code: err.code,
                        message: err.message,
                    }),
                    _ => Err(GatewayError::Unexpected {
                        status: status.as_u16(),
                        body,
                    }),
                }
            },
            |e: &GatewayError| {
                if e.is_retryable() {
                    tracing::warn!(operation, error = %e, "Retrying payment gateway call");
                }
                e.is_retryable()
            },
        )
        .await
    }
}

#[async_trait]
impl PaymentGateway for TossPayments {
    async fn confirm(
        &self,
        payment_key: &str,
        order_number: &str,
        amount: i64,
    ) -> Result<GatewayPayment, GatewayError> {
        let body = json!({
            "paymentKey": payment_key,
            "orderId": order_number,
            "amount": amount,
        });

        self.execute("confirm", || {
            self.http
                .post(self.url("/v1/payments/confirm"))
                .header("Idempotency-Key", order_number)
                .json(&body)
        })
        .await
    }

    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, GatewayError> {
        let url = self.payment_url(payment_key, None)?;
        self.execute("get_payment", || self.http.get(url.as_str()))
            .await
    }

    async fn cancel(
        &self,
        payment_key: &str,
        reason: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let body = json!({ "cancelReason": reason });
        let idempotency_key = format!("cancel-{}", payment_key);
        let url = self.payment_url(payment_key, Some("cancel"))?;

        self.execute("cancel", || {
            self.http
                .post(url.as_str())
                .header("Idempotency-Key", &idempotency_key)
                .json(&body)
        })
        .await
    }
}
