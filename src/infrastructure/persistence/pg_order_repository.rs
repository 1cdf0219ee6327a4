//! PostgreSQL implementation of the order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    Enrollment, EnrollmentGrant, NewOrder, Order, OrderAccess, PaymentApproval, Revocation, page,
};
use crate::domain::repositories::OrderRepository;
use crate::error::AppError;
use crate::infrastructure::persistence::pg_enrollment_repository::{grant_on, lock_enrollment};

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.buyer_id, o.program_id, \
     p.title AS program_title, o.amount, o.currency, o.status, o.payment_key, o.payment_method, \
     o.failure_code, o.failure_message, o.approved_at, o.refunded_at, o.refund_reason, \
     o.created_at, o.updated_at";

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    buyer_id: Uuid,
    program_id: i64,
    program_title: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    payment_key: Option<String>,
    payment_method: Option<String>,
    failure_code: Option<String>,
    failure_message: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    refund_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            buyer_id: row.buyer_id,
            program_id: row.program_id,
            program_title: row.program_title,
            amount: row.amount,
            currency: row.currency,
            status: row.status.parse()?,
            payment_key: row.payment_key,
            payment_method: row.payment_method,
            failure_code: row.failure_code,
            failure_message: row.failure_message,
            approved_at: row.approved_at,
            refunded_at: row.refunded_at,
            refund_reason: row.refund_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RefundedRow {
    #[sqlx(flatten)]
    order: OrderRow,
    access_days: Option<i32>,
    prior_expires_at: Option<DateTime<Utc>>,
}

/// PostgreSQL repository for orders.
pub struct PgOrderRepository {
    pool: Arc<PgPool>,
}

impl PgOrderRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_where(&self, condition: &str, value: &str) -> Result<Option<Order>, AppError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN programs p ON p.id = o.program_id
            WHERE {condition}
            "#
        ))
        .bind(value)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Order::try_from).transpose()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, new_order: NewOrder) -> Result<Order, AppError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r#"
            WITH o AS (
                INSERT INTO orders (order_number, buyer_id, program_id, amount, currency)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {ORDER_COLUMNS}
            FROM o
            LEFT JOIN programs p ON p.id = o.program_id
            "#
        ))
        .bind(&new_order.order_number)
        .bind(new_order.buyer_id)
        .bind(new_order.program_id)
        .bind(new_order.amount)
        .bind(&new_order.currency)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, AppError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN programs p ON p.id = o.program_id
            WHERE o.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, AppError> {
        self.find_where("o.order_number = $1", order_number).await
    }

    async fn find_by_payment_key(&self, payment_key: &str) -> Result<Option<Order>, AppError> {
        self.find_where("o.payment_key = $1", payment_key).await
    }

    async fn find_pending(
        &self,
        buyer_id: &Uuid,
        program_id: i64,
        amount: i64,
    ) -> Result<Option<Order>, AppError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN programs p ON p.id = o.program_id
            WHERE o.buyer_id = $1 AND o.program_id = $2 AND o.amount = $3
              AND o.status = 'pending'
            ORDER BY o.created_at DESC
            LIMIT 1
            "#
        ))
        .bind(buyer_id)
        .bind(program_id)
        .bind(amount)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn mark_failed(&self, id: i64, code: &str, message: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'failed', failure_code = $2, failure_message = $3, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(message)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_canceled(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'canceled', updated_at = now() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete(
        &self,
        id: i64,
        approval: PaymentApproval,
        grant: EnrollmentGrant,
    ) -> Result<Enrollment, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid', payment_key = $2, payment_method = $3, approved_at = $4,
                failure_code = NULL, failure_message = NULL, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(&approval.payment_key)
        .bind(&approval.method)
        .bind(approval.approved_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::conflict(
                "Order is no longer pending",
                json!({ "order_id": id }),
            ));
        }

        let grant = EnrollmentGrant {
            order_id: Some(id),
            ..grant
        };
        let (enrollment, access) = grant_on(&mut *tx, &grant, approval.approved_at).await?;

        sqlx::query("UPDATE orders SET access_days = $2, prior_expires_at = $3 WHERE id = $1")
            .bind(id)
            .bind(access.access_days)
            .bind(access.prior_expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(enrollment)
    }

    async fn refund(&self, id: i64, reason: &str) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<RefundedRow> = sqlx::query_as(&format!(
            r#"
            WITH o AS (
                UPDATE orders
                SET status = 'refunded', refunded_at = now(), refund_reason = $2, updated_at = now()
                WHERE id = $1 AND status = 'paid'
                RETURNING *
            )
            SELECT {ORDER_COLUMNS}, o.access_days, o.prior_expires_at
            FROM o
            LEFT JOIN programs p ON p.id = o.program_id
            "#
        ))
        .bind(id)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(AppError::conflict(
                "Only paid orders can be refunded",
                json!({ "order_id": id }),
            ));
        };

        let access = OrderAccess {
            access_days: row.access_days,
            prior_expires_at: row.prior_expires_at,
        };
        let order = row.order;

        let current = lock_enrollment(&mut *tx, &order.buyer_id, order.program_id).await?;
        let revocation = current
            .as_ref()
            .map(|e| e.revoke(&access, Utc::now()))
            .unwrap_or(Revocation::Unchanged);

        match (current, revocation) {
            (Some(enrollment), Revocation::Shorten(expires_at)) => {
                sqlx::query(
                    "UPDATE enrollments SET expires_at = $2, updated_at = now() WHERE id = $1",
                )
                .bind(enrollment.id)
                .bind(expires_at)
                .execute(&mut *tx)
                .await?;
            }
            (Some(enrollment), Revocation::Cancel) => {
                sqlx::query(
                    "UPDATE enrollments SET status = 'canceled', updated_at = now() WHERE id = $1",
                )
                .bind(enrollment.id)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        tx.commit().await?;

        order.try_into()
    }

    async fn list_by_buyer(&self, buyer_id: &Uuid) -> Result<Vec<Order>, AppError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN programs p ON p.id = o.program_id
            WHERE o.buyer_id = $1
            ORDER BY o.created_at DESC
            "#
        ))
        .bind(buyer_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_by_coach(
        &self,
        coach_id: Option<Uuid>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Order>, AppError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            JOIN programs p ON p.id = o.program_id
            WHERE ($1::uuid IS NULL OR p.coach_id = $1)
            ORDER BY o.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(coach_id)
        .bind(page_size)
        .bind(page::offset(page, page_size))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn count_by_coach(&self, coach_id: Option<Uuid>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders o
            JOIN programs p ON p.id = o.program_id
            WHERE ($1::uuid IS NULL OR p.coach_id = $1)
            "#,
        )
        .bind(coach_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
