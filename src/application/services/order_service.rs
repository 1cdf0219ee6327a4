//! Checkout, payment confirmation, refunds and gateway reconciliation.
//!
//! Order lifecycle:
//!
//! ```text
//! pending ──confirm──▶ paid ──refund──▶ refunded
//!    │
//!    ├──fail──▶ failed
//!    └──cancel─▶ canceled
//! ```
//!
//! Marking an order paid and granting the enrollment happen in one database
//! transaction ([`OrderRepository::complete`]); the gateway is always called
//! before that transaction, never inside it.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::application::services::authorization::{owner_scope, require_author, require_manager};
use crate::domain::entities::{
    Enrollment, EnrollmentGrant, NewOrder, Order, OrderStatus, Page, PaymentApproval, Profile,
    Program,
};
use crate::domain::repositories::{EnrollmentRepository, OrderRepository, ProgramRepository};
use crate::error::AppError;
use crate::infrastructure::payments::{GatewayError, GatewayPaymentStatus, PaymentGateway};
use crate::utils::code_generator::generate_order_number;

pub const AMOUNT_MISMATCH: &str = "AMOUNT_MISMATCH";
const ALREADY_CANCELED: &str = "ALREADY_CANCELED_PAYMENT";
/// Fail-redirect codes meaning the buyer closed the payment window.
const BUYER_CANCEL_CODES: [&str; 2] = ["PAY_PROCESS_CANCELED", "USER_CANCEL"];
const MAX_REASON_CHARS: usize = 200;
const DEFAULT_REFUND_REASON: &str = "Refund requested by coach";

/// Settings the hosted checkout widget needs.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub client_key: String,
    pub public_base_url: String,
}

/// Everything the checkout page hands to the gateway widget.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub client_key: String,
    pub order_number: String,
    pub order_name: String,
    pub amount: i64,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: String,
    pub success_url: String,
    pub fail_url: String,
}

/// Result of starting a checkout.
#[derive(Debug, Clone)]
pub enum CheckoutStart {
    /// Free program: access was granted immediately.
    Free(Enrollment),
    /// Paid program: the buyer continues at the gateway.
    Checkout(CheckoutSession),
}

/// Service orchestrating orders, the payment gateway and enrollments.
pub struct OrderService<O, P, E>
where
    O: OrderRepository,
    P: ProgramRepository,
    E: EnrollmentRepository,
{
    orders: Arc<O>,
    programs: Arc<P>,
    enrollments: Arc<E>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl<O, P, E> OrderService<O, P, E>
where
    O: OrderRepository,
    P: ProgramRepository,
    E: EnrollmentRepository,
{
    pub fn new(
        orders: Arc<O>,
        programs: Arc<P>,
        enrollments: Arc<E>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            programs,
            enrollments,
            gateway,
            settings,
        }
    }

    /// Starts buying a published program.
    ///
    /// Free programs are granted at once through a zero-amount order. Paid
    /// programs reuse the buyer's pending order for the same price or open
    /// a new one.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the program is not on sale
    /// - [`AppError::Validation`] if the buyer owns the program
    /// - [`AppError::Conflict`] if the buyer already has lifetime access
    pub async fn start_checkout(&self, buyer: &Profile, slug: &str) -> Result<CheckoutStart, AppError> {
        let program = self
            .programs
            .find_by_slug(slug)
            .await?
            .filter(Program::is_published)
            .ok_or_else(|| AppError::not_found("Program not found", json!({ "slug": slug })))?;

        if program.is_owned_by(&buyer.id) {
            return Err(AppError::bad_request(
                "You cannot buy your own program",
                json!({ "program_id": program.id }),
            ));
        }

        let now = Utc::now();
        if let Some(current) = self.enrollments.find(&buyer.id, program.id).await?
            && current.is_lifetime()
        {
            return Err(AppError::conflict(
                "You already have lifetime access to this program",
                json!({ "program_id": program.id }),
            ));
        }

        if program.is_free() {
            let order = self.create_order(buyer, &program).await?;
            let enrollment = self
                .orders
                .complete(order.id, PaymentApproval::free(now), grant_for(&order, &program))
                .await?;
            metrics::counter!("orders_completed_total").increment(1);
            tracing::info!(
                order_id = order.id,
                program_id = program.id,
                "Free program granted"
            );
            return Ok(CheckoutStart::Free(enrollment));
        }

        let order = match self
            .orders
            .find_pending(&buyer.id, program.id, program.price)
            .await?
        {
            Some(order) => order,
            None => self.create_order(buyer, &program).await?,
        };

        let base = self.settings.public_base_url.trim_end_matches('/');
        Ok(CheckoutStart::Checkout(CheckoutSession {
            client_key: self.settings.client_key.clone(),
            order_number: order.order_number,
            order_name: program.title,
            amount: order.amount,
            currency: order.currency,
            customer_email: buyer.email.clone(),
            customer_name: buyer.display_name.clone(),
            success_url: format!("{}/payments/success", base),
            fail_url: format!("{}/payments/fail", base),
        }))
    }

    /// Confirms a payment after the gateway's success redirect.
    ///
    /// Replaying the redirect for an order already paid with the same
    /// payment key succeeds without calling the gateway again.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] / [`AppError::Forbidden`] for unknown or foreign orders
    /// - [`AppError::Conflict`] if the order is no longer pending
    /// - [`AppError::Validation`] if the amount was tampered with (the order is failed)
    /// - [`AppError::PaymentFailed`] if the gateway declines (the order is failed)
    /// - [`AppError::Upstream`] if the gateway is unreachable (the order stays pending)
    pub async fn confirm_payment(
        &self,
        buyer: &Profile,
        order_number: &str,
        payment_key: &str,
        amount: i64,
    ) -> Result<Order, AppError> {
        let order = self.find_buyer_order(buyer, order_number).await?;

        if order.is_paid() && order.payment_key.as_deref() == Some(payment_key) {
            return Ok(order);
        }
        if !order.status.can_transition_to(OrderStatus::Paid) {
            return Err(AppError::conflict(
                "This order is no longer awaiting payment",
                json!({ "order_number": order_number, "status": order.status.as_str() }),
            ));
        }

        if amount != order.amount {
            self.fail(&order, AMOUNT_MISMATCH, "Paid amount does not match the order")
                .await?;
            return Err(AppError::bad_request(
                "Payment amount does not match the order",
                json!({ "expected": order.amount, "received": amount }),
            ));
        }

        let program = self.program_of(&order).await?;

        let payment = match self.gateway.confirm(payment_key, order_number, amount).await {
            Ok(payment) => payment,
            Err(GatewayError::Rejected { code, message }) => {
                self.fail(&order, &code, &message).await?;
                return Err(AppError::payment_failed(
                    message,
                    json!({ "gateway_code": code, "order_number": order_number }),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if payment.status != GatewayPaymentStatus::Done {
            tracing::warn!(
                order_id = order.id,
                status = ?payment.status,
                "Confirmed payment is not complete"
            );
            return Err(AppError::payment_failed(
                "The payment was not completed",
                json!({ "order_number": order_number }),
            ));
        }

        let approval = PaymentApproval {
            payment_key: Some(payment.payment_key),
            method: payment.method.unwrap_or_else(|| "unknown".to_string()),
            approved_at: payment.approved_at.unwrap_or_else(Utc::now),
        };

        match self
            .orders
            .complete(order.id, approval, grant_for(&order, &program))
            .await
        {
            Ok(_) => {}
            // A concurrent confirm or webhook got there first.
            Err(AppError::Conflict { .. }) => {
                let current = self.find_order(order.id).await?;
                if current.is_paid() && current.payment_key.as_deref() == Some(payment_key) {
                    return Ok(current);
                }
                return Err(AppError::conflict(
                    "This order is no longer awaiting payment",
                    json!({ "order_number": order_number }),
                ));
            }
            Err(e) => return Err(e),
        }

        metrics::counter!("orders_completed_total").increment(1);
        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            program_id = order.program_id,
            "Order paid"
        );

        self.find_order(order.id).await
    }

    /// Records the outcome of the gateway's fail redirect.
    ///
    /// A buyer closing the payment window cancels the order; any other code
    /// fails it. Orders that are no longer pending are returned unchanged.
    pub async fn fail_payment(
        &self,
        buyer: &Profile,
        order_number: &str,
        code: &str,
        message: &str,
    ) -> Result<Order, AppError> {
        let order = self.find_buyer_order(buyer, order_number).await?;
        if order.is_pending() {
            if BUYER_CANCEL_CODES.contains(&code) {
                self.cancel(&order).await?;
            } else {
                self.fail(&order, code, message).await?;
            }
            return self.find_order(order.id).await;
        }
        Ok(order)
    }

    /// Refunds a paid order in full and revokes the access it granted.
    ///
    /// # Errors
    ///
    /// - [`AppError::Forbidden`] unless the actor owns the program or is an admin
    /// - [`AppError::Conflict`] if the order is not paid
    pub async fn refund(&self, actor: &Profile, order_id: i64, reason: &str) -> Result<Order, AppError> {
        let order = self.find_order(order_id).await?;
        let program = self.program_of(&order).await?;
        require_manager(actor, &program.coach_id)?;

        if !order.status.can_transition_to(OrderStatus::Refunded) {
            return Err(AppError::conflict(
                "Only paid orders can be refunded",
                json!({ "order_id": order_id, "status": order.status.as_str() }),
            ));
        }

        let reason = refund_reason(reason);

        if !order.is_free() {
            let payment_key = order.payment_key.as_deref().ok_or_else(|| {
                AppError::internal(
                    "Paid order has no payment key",
                    json!({ "order_id": order_id }),
                )
            })?;

            match self.gateway.cancel(payment_key, &reason).await {
                Ok(_) => {}
                Err(GatewayError::Rejected { code, .. }) if code == ALREADY_CANCELED => {
                    tracing::info!(order_id, "Payment already canceled at gateway");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let refunded = self.orders.refund(order_id, &reason).await?;

        metrics::counter!("orders_refunded_total").increment(1);
        tracing::info!(
            order_id,
            order_number = %refunded.order_number,
            program_id = refunded.program_id,
            "Order refunded"
        );
        Ok(refunded)
    }

    /// Brings an order in line with the gateway's view of a payment.
    ///
    /// Webhook bodies are never trusted; the payment is re-read from the
    /// gateway. Returns `None` if no order matches.
    pub async fn reconcile(&self, payment_key: &str) -> Result<Option<Order>, AppError> {
        let payment = self.gateway.get_payment(payment_key).await?;

        let order = match self.orders.find_by_payment_key(payment_key).await? {
            Some(order) => Some(order),
            None => self.orders.find_by_number(&payment.order_number).await?,
        };
        let Some(order) = order else {
            tracing::warn!(payment_key, "Webhook for unknown payment");
            return Ok(None);
        };
        if order.order_number != payment.order_number {
            tracing::warn!(order_id = order.id, "Webhook payment belongs to another order");
            return Ok(None);
        }

        match payment.status {
            GatewayPaymentStatus::Done if order.is_pending() => {
                if payment.total_amount != order.amount {
                    self.fail(&order, AMOUNT_MISMATCH, "Paid amount does not match the order")
                        .await?;
                } else {
                    let program = self.program_of(&order).await?;
                    let approval = PaymentApproval {
                        payment_key: Some(payment.payment_key.clone()),
                        method: payment.method.clone().unwrap_or_else(|| "unknown".to_string()),
                        approved_at: payment.approved_at.unwrap_or_else(Utc::now),
                    };
                    match self
                        .orders
                        .complete(order.id, approval, grant_for(&order, &program))
                        .await
                    {
                        Ok(_) => {
                            metrics::counter!("orders_completed_total").increment(1);
                            tracing::info!(order_id = order.id, "Order paid via webhook");
                        }
                        Err(AppError::Conflict { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            GatewayPaymentStatus::Canceled if order.is_paid() => {
                match self
                    .orders
                    .refund(order.id, "Canceled at payment gateway")
                    .await
                {
                    Ok(_) => {
                        metrics::counter!("orders_refunded_total").increment(1);
                        tracing::info!(order_id = order.id, "Order refunded via webhook");
                    }
                    Err(AppError::Conflict { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            GatewayPaymentStatus::Canceled if order.is_pending() => {
                self.cancel(&order).await?;
            }
            GatewayPaymentStatus::Aborted | GatewayPaymentStatus::Expired if order.is_pending() => {
                let code = if payment.status == GatewayPaymentStatus::Aborted {
                    "ABORTED"
                } else {
                    "EXPIRED"
                };
                self.fail(&order, code, "Payment was not completed").await?;
            }
            status => {
                tracing::debug!(order_id = order.id, ?status, "Webhook needs no change");
            }
        }

        self.find_order(order.id).await.map(Some)
    }

    pub async fn orders_for_buyer(&self, buyer: &Profile) -> Result<Vec<Order>, AppError> {
        self.orders.list_by_buyer(&buyer.id).await
    }

    /// Orders for the actor's programs (all orders for admins).
    pub async fn orders_for_coach(
        &self,
        actor: &Profile,
        page: i64,
        page_size: i64,
    ) -> Result<Page<Order>, AppError> {
        require_author(actor)?;
        let scope = owner_scope(actor);
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);

        let (items, total) = tokio::try_join!(
            self.orders.list_by_coach(scope, page, page_size),
            self.orders.count_by_coach(scope)
        )?;
        Ok(Page::new(items, page, page_size, total))
    }

    async fn create_order(&self, buyer: &Profile, program: &Program) -> Result<Order, AppError> {
        let order = self
            .orders
            .create(NewOrder {
                order_number: generate_order_number(Utc::now()),
                buyer_id: buyer.id,
                program_id: program.id,
                amount: program.price,
                currency: program.currency.clone(),
            })
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            program_id = program.id,
            "Order created"
        );
        Ok(order)
    }

    async fn fail(&self, order: &Order, code: &str, message: &str) -> Result<(), AppError> {
        if self.orders.mark_failed(order.id, code, message).await? {
            let reason = if code == AMOUNT_MISMATCH {
                "amount_mismatch"
            } else {
                "gateway"
            };
            metrics::counter!("orders_failed_total", "reason" => reason).increment(1);
            tracing::warn!(
                order_id = order.id,
                order_number = %order.order_number,
                code,
                "Order failed"
            );
        }
        Ok(())
    }

    async fn cancel(&self, order: &Order) -> Result<(), AppError> {
        if self.orders.mark_canceled(order.id).await? {
            metrics::counter!("orders_canceled_total").increment(1);
            tracing::info!(
                order_id = order.id,
                order_number = %order.order_number,
                "Order canceled"
            );
        }
        Ok(())
    }

    async fn find_order(&self, id: i64) -> Result<Order, AppError> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found", json!({ "order_id": id })))
    }

    async fn find_buyer_order(&self, buyer: &Profile, order_number: &str) -> Result<Order, AppError> {
        let order = self
            .orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Order not found", json!({ "order_number": order_number }))
            })?;

        if order.buyer_id != buyer.id {
            return Err(AppError::forbidden(
                "This order belongs to another account",
                json!({ "order_number": order_number }),
            ));
        }
        Ok(order)
    }

    async fn program_of(&self, order: &Order) -> Result<Program, AppError> {
        self.programs
            .find_by_id(order.program_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Program not found", json!({ "program_id": order.program_id }))
            })
    }
}

fn grant_for(order: &Order, program: &Program) -> EnrollmentGrant {
    EnrollmentGrant {
        user_id: order.buyer_id,
        program_id: program.id,
        order_id: Some(order.id),
        access_days: program.access_days,
    }
}

fn refund_reason(reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        return DEFAULT_REFUND_REASON.to_string();
    }
    reason.chars().take(MAX_REASON_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::{enrollment, order, profile, sample_program};
    use crate::domain::entities::{EnrollmentStatus, OrderStatus, Role};
    use crate::domain::repositories::{
        MockEnrollmentRepository, MockOrderRepository, MockProgramRepository,
    };
    use crate::infrastructure::payments::{GatewayPayment, MockPaymentGateway};

    type Service = OrderService<MockOrderRepository, MockProgramRepository, MockEnrollmentRepository>;

    const ORDER_NUMBER: &str = "20260101-AbCdEfGhIjKl";

    fn service(
        orders: MockOrderRepository,
        programs: MockProgramRepository,
        enrollments: MockEnrollmentRepository,
        gateway: MockPaymentGateway,
    ) -> Service {
        OrderService::new(
            Arc::new(orders),
            Arc::new(programs),
            Arc::new(enrollments),
            Arc::new(gateway),
            CheckoutSettings {
                client_key: "test_ck".to_string(),
                public_base_url: "https://coach.example.com/".to_string(),
            },
        )
    }

    fn programs_with(program: Program) -> MockProgramRepository {
        let mut programs = MockProgramRepository::new();
        let by_slug = program.clone();
        programs
            .expect_find_by_slug()
            .returning(move |_| Ok(Some(by_slug.clone())));
        programs
            .expect_find_by_id()
            .returning(move |_| Ok(Some(program.clone())));
        programs
    }

    fn payment(status: GatewayPaymentStatus, amount: i64) -> GatewayPayment {
        GatewayPayment {
            payment_key: "pay_123".to_string(),
            order_number: ORDER_NUMBER.to_string(),
            status,
            total_amount: amount,
            method: Some("card".to_string()),
            approved_at: Some(Utc::now()),
        }
    }

    fn active(expires_at: Option<chrono::DateTime<Utc>>) -> Enrollment {
        enrollment(EnrollmentStatus::Active, Utc::now(), expires_at)
    }

    #[tokio::test]
    async fn test_free_program_completes_immediately() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_create()
            .withf(|o| o.amount == 0)
            .times(1)
            .returning(move |_| Ok(order(OrderStatus::Pending, buyer_id, 0)));
        orders
            .expect_complete()
            .withf(|id, approval, grant| {
                *id == 10
                    && approval.method == "free"
                    && approval.payment_key.is_none()
                    && grant.order_id == Some(10)
            })
            .times(1)
            .returning(|_, _, _| Ok(active(None)));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_find().returning(|_, _| Ok(None));

        let result = service(
            orders,
            programs_with(sample_program(0, None)),
            enrollments,
            MockPaymentGateway::new(),
        )
        .start_checkout(&buyer, "strength-basics")
        .await
        .unwrap();

        assert!(matches!(result, CheckoutStart::Free(_)));
    }

    #[tokio::test]
    async fn test_paid_program_reuses_pending_order() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_pending()
            .withf(move |id, program_id, amount| {
                *id == buyer_id && *program_id == 1 && *amount == 49000
            })
            .returning(move |_, _, _| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders.expect_create().times(0);

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_find().returning(|_, _| Ok(None));

        let result = service(
            orders,
            programs_with(sample_program(49000, Some(90))),
            enrollments,
            MockPaymentGateway::new(),
        )
        .start_checkout(&buyer, "strength-basics")
        .await
        .unwrap();

        match result {
            CheckoutStart::Checkout(session) => {
                assert_eq!(session.order_number, ORDER_NUMBER);
                assert_eq!(session.amount, 49000);
                assert_eq!(session.client_key, "test_ck");
                assert_eq!(session.success_url, "https://coach.example.com/payments/success");
                assert_eq!(session.fail_url, "https://coach.example.com/payments/fail");
            }
            CheckoutStart::Free(_) => panic!("paid program granted for free"),
        }
    }

    #[tokio::test]
    async fn test_paid_program_creates_order_when_none_pending() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_pending().returning(|_, _, _| Ok(None));
        orders
            .expect_create()
            .withf(|o| o.amount == 49000 && o.currency == "KRW" && o.order_number.len() == 21)
            .times(1)
            .returning(move |_| Ok(order(OrderStatus::Pending, buyer_id, 49000)));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_find()
            .returning(|_, _| Ok(Some(active(Some(Utc::now() + chrono::Duration::days(3))))));

        let result = service(
            orders,
            programs_with(sample_program(49000, Some(90))),
            enrollments,
            MockPaymentGateway::new(),
        )
        .start_checkout(&buyer, "strength-basics")
        .await;
        assert!(matches!(result, Ok(CheckoutStart::Checkout(_))));
    }

    #[tokio::test]
    async fn test_lifetime_enrollment_blocks_checkout() {
        let buyer = profile(Role::Member);

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments.expect_find().returning(|_, _| Ok(Some(active(None))));

        let result = service(
            MockOrderRepository::new(),
            programs_with(sample_program(49000, None)),
            enrollments,
            MockPaymentGateway::new(),
        )
        .start_checkout(&buyer, "strength-basics")
        .await;
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_owner_cannot_buy_own_program() {
        let coach = profile(Role::Coach);
        let mut program = sample_program(49000, None);
        program.coach_id = coach.id;

        let result = service(
            MockOrderRepository::new(),
            programs_with(program),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .start_checkout(&coach, "strength-basics")
        .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unpublished_program_not_for_sale() {
        let buyer = profile(Role::Member);
        let mut program = sample_program(49000, None);
        program.status = crate::domain::entities::ProgramStatus::Archived;

        let result = service(
            MockOrderRepository::new(),
            programs_with(program),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .start_checkout(&buyer, "strength-basics")
        .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_confirm_payment_success() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders
            .expect_complete()
            .withf(|id, approval, grant| {
                *id == 10
                    && approval.payment_key.as_deref() == Some("pay_123")
                    && approval.method == "card"
                    && grant.access_days == Some(90)
            })
            .times(1)
            .returning(|_, _, _| Ok(active(None)));
        orders.expect_find_by_id().returning(move |_| {
            let mut paid = order(OrderStatus::Paid, buyer_id, 49000);
            paid.payment_key = Some("pay_123".to_string());
            Ok(Some(paid))
        });

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_confirm()
            .withf(|key, number, amount| key == "pay_123" && number == ORDER_NUMBER && *amount == 49000)
            .times(1)
            .returning(|_, _, _| Ok(payment(GatewayPaymentStatus::Done, 49000)));

        let paid = service(
            orders,
            programs_with(sample_program(49000, Some(90))),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await
        .unwrap();

        assert!(paid.is_paid());
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_number().returning(move |_| {
            let mut paid = order(OrderStatus::Paid, buyer_id, 49000);
            paid.payment_key = Some("pay_123".to_string());
            Ok(Some(paid))
        });
        orders.expect_complete().times(0);

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_confirm().times(0);

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_confirm_payment_amount_mismatch_fails_order() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders
            .expect_mark_failed()
            .withf(|id, code, _| *id == 10 && code == AMOUNT_MISMATCH)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_confirm().times(0);

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 100)
        .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_confirm_payment_gateway_rejection() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders
            .expect_mark_failed()
            .withf(|_, code, message| code == "REJECT_CARD_COMPANY" && message == "Card declined")
            .times(1)
            .returning(|_, _, _| Ok(true));
        orders.expect_complete().times(0);

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_confirm().returning(|_, _, _| {
            Err(GatewayError::Rejected {
                code: "REJECT_CARD_COMPANY".to_string(),
                message: "Card declined".to_string(),
            })
        });

        let result = service(
            orders,
            programs_with(sample_program(49000, None)),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await;
        assert!(matches!(result, Err(AppError::PaymentFailed { .. })));
    }

    #[tokio::test]
    async fn test_confirm_payment_transport_error_keeps_order_pending() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders.expect_mark_failed().times(0);

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_confirm()
            .returning(|_, _, _| Err(GatewayError::Transport("timeout".to_string())));

        let result = service(
            orders,
            programs_with(sample_program(49000, None)),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await;
        assert!(matches!(result, Err(AppError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_confirm_foreign_order_is_forbidden() {
        let buyer = profile(Role::Member);

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(|_| Ok(Some(order(OrderStatus::Pending, uuid::Uuid::new_v4(), 49000))));

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_confirm_failed_order_conflicts() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Failed, buyer_id, 49000))));

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .confirm_payment(&buyer, ORDER_NUMBER, "pay_123", 49000)
        .await;
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_refund_cancels_at_gateway_then_records() {
        let coach = profile(Role::Coach);
        let mut program = sample_program(49000, None);
        program.coach_id = coach.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(|_| {
            let mut paid = order(OrderStatus::Paid, uuid::Uuid::new_v4(), 49000);
            paid.payment_key = Some("pay_123".to_string());
            paid.payment_method = Some("card".to_string());
            Ok(Some(paid))
        });
        orders
            .expect_refund()
            .withf(|id, reason| *id == 10 && reason == "Injury")
            .times(1)
            .returning(|_, _| Ok(order(OrderStatus::Refunded, uuid::Uuid::new_v4(), 49000)));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel()
            .withf(|key, reason| key == "pay_123" && reason == "Injury")
            .times(1)
            .returning(|_, _| Ok(payment(GatewayPaymentStatus::Canceled, 49000)));

        let refunded = service(
            orders,
            programs_with(program),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .refund(&coach, 10, " Injury ")
        .await
        .unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_refund_free_order_skips_gateway() {
        let admin = profile(Role::Admin);

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(|_| {
            let mut paid = order(OrderStatus::Paid, uuid::Uuid::new_v4(), 0);
            paid.payment_method = Some("free".to_string());
            Ok(Some(paid))
        });
        orders
            .expect_refund()
            .withf(|_, reason| reason == DEFAULT_REFUND_REASON)
            .times(1)
            .returning(|_, _| Ok(order(OrderStatus::Refunded, uuid::Uuid::new_v4(), 0)));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel().times(0);

        service(
            orders,
            programs_with(sample_program(0, None)),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .refund(&admin, 10, "")
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_refund_by_other_coach_is_forbidden() {
        let coach = profile(Role::Coach);

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_id()
            .returning(|_| Ok(Some(order(OrderStatus::Paid, uuid::Uuid::new_v4(), 49000))));
        orders.expect_refund().times(0);

        let result = service(
            orders,
            programs_with(sample_program(49000, None)),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .refund(&coach, 10, "")
        .await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_refund_pending_order_conflicts() {
        let admin = profile(Role::Admin);

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_id()
            .returning(|_| Ok(Some(order(OrderStatus::Pending, uuid::Uuid::new_v4(), 49000))));

        let result = service(
            orders,
            programs_with(sample_program(49000, None)),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .refund(&admin, 10, "")
        .await;
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_reconcile_done_completes_pending_order() {
        let buyer_id = uuid::Uuid::new_v4();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .returning(|_| Ok(payment(GatewayPaymentStatus::Done, 49000)));

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_payment_key().returning(|_| Ok(None));
        orders
            .expect_find_by_number()
            .withf(|number| number == ORDER_NUMBER)
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders
            .expect_complete()
            .times(1)
            .returning(|_, _, _| Ok(active(None)));
        orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order(OrderStatus::Paid, buyer_id, 49000))));

        let reconciled = service(
            orders,
            programs_with(sample_program(49000, None)),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .reconcile("pay_123")
        .await
        .unwrap();
        assert!(reconciled.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_reconcile_canceled_refunds_paid_order() {
        let buyer_id = uuid::Uuid::new_v4();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .returning(|_| Ok(payment(GatewayPaymentStatus::Canceled, 49000)));

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_payment_key()
            .returning(move |_| Ok(Some(order(OrderStatus::Paid, buyer_id, 49000))));
        orders
            .expect_refund()
            .times(1)
            .returning(move |_, _| Ok(order(OrderStatus::Refunded, buyer_id, 49000)));
        orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order(OrderStatus::Refunded, buyer_id, 49000))));

        let reconciled = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .reconcile("pay_123")
        .await
        .unwrap();
        assert_eq!(reconciled.unwrap().status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_payment_is_ignored() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .returning(|_| Ok(payment(GatewayPaymentStatus::Done, 49000)));

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_payment_key().returning(|_| Ok(None));
        orders.expect_find_by_number().returning(|_| Ok(None));

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .reconcile("pay_123")
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_canceled_cancels_pending_order() {
        let buyer_id = uuid::Uuid::new_v4();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_payment()
            .returning(|_| Ok(payment(GatewayPaymentStatus::Canceled, 49000)));

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_payment_key().returning(|_| Ok(None));
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders.expect_refund().times(0);
        orders.expect_mark_failed().times(0);
        orders
            .expect_mark_canceled()
            .withf(|id| *id == 10)
            .times(1)
            .returning(|_| Ok(true));
        orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order(OrderStatus::Canceled, buyer_id, 49000))));

        let reconciled = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            gateway,
        )
        .reconcile("pay_123")
        .await
        .unwrap();
        assert_eq!(reconciled.unwrap().status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_buyer_closing_payment_window_cancels_order() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders.expect_mark_failed().times(0);
        orders
            .expect_mark_canceled()
            .times(1)
            .returning(|_| Ok(true));
        orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order(OrderStatus::Canceled, buyer_id, 49000))));

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .fail_payment(&buyer, ORDER_NUMBER, "PAY_PROCESS_CANCELED", "Canceled by user")
        .await
        .unwrap();
        assert_eq!(result.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_declined_card_fails_order() {
        let buyer = profile(Role::Member);
        let buyer_id = buyer.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_number()
            .returning(move |_| Ok(Some(order(OrderStatus::Pending, buyer_id, 49000))));
        orders.expect_mark_canceled().times(0);
        orders
            .expect_mark_failed()
            .withf(|_, code, _| code == "REJECT_CARD_COMPANY")
            .times(1)
            .returning(|_, _, _| Ok(true));
        orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order(OrderStatus::Failed, buyer_id, 49000))));

        let result = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .fail_payment(&buyer, ORDER_NUMBER, "REJECT_CARD_COMPANY", "Declined")
        .await
        .unwrap();
        assert_eq!(result.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_orders_for_coach_pages() {
        let coach = profile(Role::Coach);
        let coach_id = coach.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_list_by_coach()
            .withf(move |scope, page, size| *scope == Some(coach_id) && *page == 2 && *size == 20)
            .returning(|_, _, _| Ok(vec![]));
        orders.expect_count_by_coach().returning(|_| Ok(25));

        let page = service(
            orders,
            MockProgramRepository::new(),
            MockEnrollmentRepository::new(),
            MockPaymentGateway::new(),
        )
        .orders_for_coach(&coach, 2, 20)
        .await
        .unwrap();
        assert_eq!(page.total_pages(), 2);
        assert!(!page.has_next());
    }

    #[test]
    fn test_refund_reason_is_trimmed_and_capped() {
        assert_eq!(refund_reason("  "), DEFAULT_REFUND_REASON);
        assert_eq!(refund_reason(" Injury "), "Injury");
        assert_eq!(refund_reason(&"x".repeat(500)).chars().count(), MAX_REASON_CHARS);
    }
}
