//! Repository trait for orders and their payment state.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{Enrollment, EnrollmentGrant, NewOrder, Order, PaymentApproval};
use crate::error::AppError;

/// Repository interface for orders.
///
/// State changes are guarded by the current status in SQL
/// (`WHERE status = 'pending'`), so concurrent confirmations of one order
/// settle it at most once.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgOrderRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_order.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Creates a pending order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the order number is already used.
    async fn create(&self, new_order: NewOrder) -> Result<Order, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, AppError>;

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, AppError>;

    async fn find_by_payment_key(&self, payment_key: &str) -> Result<Option<Order>, AppError>;

    /// Latest pending order of a buyer for a program at the given amount.
    async fn find_pending(
        &self,
        buyer_id: &Uuid,
        program_id: i64,
        amount: i64,
    ) -> Result<Option<Order>, AppError>;

    /// Marks a pending order as failed.
    ///
    /// Returns `Ok(false)` if the order was no longer pending.
    async fn mark_failed(&self, id: i64, code: &str, message: &str) -> Result<bool, AppError>;

    /// Marks a pending order as canceled.
    async fn mark_canceled(&self, id: i64) -> Result<bool, AppError>;

    /// Marks a pending order as paid and grants the enrollment, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the order is no longer pending; nothing
    /// is written in that case.
    async fn complete(
        &self,
        id: i64,
        approval: PaymentApproval,
        grant: EnrollmentGrant,
    ) -> Result<Enrollment, AppError>;

    /// Marks a paid order as refunded and takes back the access it added to
    /// the buyer's enrollment, in one transaction.
    ///
    /// Time bought by other orders is kept; the enrollment is canceled only
    /// when nothing paid remains.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the order is not paid.
    async fn refund(&self, id: i64, reason: &str) -> Result<Order, AppError>;

    /// A buyer's orders, newest first.
    async fn list_by_buyer(&self, buyer_id: &Uuid) -> Result<Vec<Order>, AppError>;

    /// Orders of programs owned by `coach_id`, newest first; `None` lists all.
    async fn list_by_coach(
        &self,
        coach_id: Option<Uuid>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Order>, AppError>;

    async fn count_by_coach(&self, coach_id: Option<Uuid>) -> Result<i64, AppError>;
}
