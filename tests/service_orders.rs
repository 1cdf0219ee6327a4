mod common;

use coach_programs::application::services::CheckoutStart;
use coach_programs::domain::entities::{EnrollmentStatus, OrderStatus, Profile};
use coach_programs::error::AppError;
use coach_programs::state::AppState;
use sqlx::PgPool;
use uuid::Uuid;

async fn profile(state: &AppState, id: Uuid, email: &str) -> Profile {
    state
        .auth_service
        .authenticate(&common::access_token(&id, email))
        .await
        .unwrap()
}

async fn start_paid(state: &AppState, buyer: &Profile, slug: &str) -> String {
    match state.order_service.start_checkout(buyer, slug).await.unwrap() {
        CheckoutStart::Checkout(session) => session.order_number,
        CheckoutStart::Free(_) => panic!("expected a paid checkout"),
    }
}

#[sqlx::test]
async fn test_paid_checkout_confirm_and_refund(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, Some(30), "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let coach = profile(&state, coach_id, "coach@example.com").await;
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;

    let order_number = start_paid(&state, &buyer, "engine").await;
    assert_eq!(order_number.len(), 21);

    let order = state
        .order_service
        .confirm_payment(&buyer, &order_number, "pay_engine", 29000)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let again = state
        .order_service
        .confirm_payment(&buyer, &order_number, "pay_engine", 29000)
        .await
        .unwrap();
    assert_eq!(again.id, order.id);

    let enrollments = state.enrollment_service.my_enrollments(&buyer).await.unwrap();
    assert_eq!(enrollments.len(), 1);
    assert!(enrollments[0].enrollment.expires_at.is_some());

    let forbidden = state.order_service.refund(&buyer, order.id, "please").await;
    assert!(matches!(forbidden, Err(AppError::Forbidden { .. })));

    let refunded = state
        .order_service
        .refund(&coach, order.id, "Requested by member")
        .await
        .unwrap();
    assert_eq!(refunded.status, OrderStatus::Refunded);

    let enrollments = state.enrollment_service.my_enrollments(&buyer).await.unwrap();
    assert_eq!(enrollments[0].enrollment.status, EnrollmentStatus::Canceled);
}

#[sqlx::test]
async fn test_checkout_reuses_pending_order(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;

    let first = start_paid(&state, &buyer, "engine").await;
    let second = start_paid(&state, &buyer, "engine").await;

    assert_eq!(first, second);
}

#[sqlx::test]
async fn test_amount_mismatch_fails_order(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;

    let order_number = start_paid(&state, &buyer, "engine").await;
    let result = state
        .order_service
        .confirm_payment(&buyer, &order_number, "pay_cheap", 100)
        .await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
    let orders = state.order_service.orders_for_buyer(&buyer).await.unwrap();
    assert_eq!(orders[0].status, OrderStatus::Failed);
    assert_eq!(orders[0].failure_code.as_deref(), Some("AMOUNT_MISMATCH"));
}

#[sqlx::test]
async fn test_other_buyer_cannot_confirm(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    let thief_id = common::create_profile(&pool, "thief@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;
    let thief = profile(&state, thief_id, "thief@example.com").await;

    let order_number = start_paid(&state, &buyer, "engine").await;
    let result = state
        .order_service
        .confirm_payment(&thief, &order_number, "pay_x", 29000)
        .await;

    assert!(matches!(result, Err(AppError::Forbidden { .. })));
}

#[sqlx::test]
async fn test_owner_cannot_buy_own_program(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let coach = profile(&state, coach_id, "coach@example.com").await;

    let result = state.order_service.start_checkout(&coach, "engine").await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
}

#[sqlx::test]
async fn test_lifetime_enrollment_blocks_new_checkout(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    let program = common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    common::create_enrollment(&pool, buyer_id, program, None).await;
    let (state, _gateway) = common::create_test_state(pool);
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;

    let result = state.order_service.start_checkout(&buyer, "engine").await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
async fn test_operator_grant_by_email(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let member_id = common::create_profile(&pool, "member@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, Some(14), "published").await;
    let (state, _gateway) = common::create_test_state(pool);

    let enrollment = state
        .enrollment_service
        .grant("Member@Example.com", "engine")
        .await
        .unwrap();

    assert_eq!(enrollment.user_id, member_id);
    assert_eq!(enrollment.order_id, None);
    assert!(enrollment.expires_at.is_some());

    let missing = state.enrollment_service.grant("nobody@example.com", "engine").await;
    assert!(matches!(missing, Err(AppError::NotFound { .. })));
}

#[sqlx::test]
async fn test_closing_payment_window_cancels_order(pool: PgPool) {
    let coach_id = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer_id = common::create_profile(&pool, "buyer@example.com", "member").await;
    common::create_program(&pool, coach_id, "engine", 29000, None, "published").await;
    let (state, _gateway) = common::create_test_state(pool);
    let buyer = profile(&state, buyer_id, "buyer@example.com").await;

    let order_number = start_paid(&state, &buyer, "engine").await;
    let order = state
        .order_service
        .fail_payment(&buyer, &order_number, "PAY_PROCESS_CANCELED", "Canceled by buyer")
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Canceled);
    assert_eq!(order.failure_code, None);

    let retry = state
        .order_service
        .confirm_payment(&buyer, &order_number, "pay_late", 29000)
        .await;
    assert!(matches!(retry, Err(AppError::Conflict { .. })));

    let next = start_paid(&state, &buyer, "engine").await;
    assert_ne!(next, order_number);
}
