mod common;

use axum::http::StatusCode;
use axum::{Router, middleware};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use coach_programs::api;
use coach_programs::api::middleware::auth;
use sqlx::PgPool;

fn make_server(pool: PgPool) -> TestServer {
    let (state, _gateway) = common::create_test_state(pool);
    let app = Router::new()
        .nest(
            "/api",
            api::routes::protected_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer)),
        )
        .with_state(state);
    TestServer::new(app).unwrap()
}

#[sqlx::test]
async fn test_me_requires_bearer_token(pool: PgPool) {
    let server = make_server(pool);

    let response = server.get("/api/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[sqlx::test]
async fn test_me_rejects_unknown_token(pool: PgPool) {
    let server = make_server(pool);

    let response = server
        .get("/api/me")
        .add_header("Authorization", "Bearer not-a-session")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn test_me_returns_profile(pool: PgPool) {
    let user = common::create_profile(&pool, "jane@example.com", "coach").await;
    let server = make_server(pool);

    let response = server
        .get("/api/me")
        .add_header("Authorization", common::bearer(&user, "jane@example.com"))
        .await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["role"], "coach");
}

#[sqlx::test]
async fn test_first_request_creates_member_profile(pool: PgPool) {
    let server = make_server(pool.clone());
    let id = uuid::Uuid::new_v4();

    let response = server
        .get("/api/me")
        .add_header("Authorization", common::bearer(&id, "new@example.com"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["role"], "member");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test]
async fn test_my_enrollments_with_progress(pool: PgPool) {
    let coach = common::create_profile(&pool, "coach@example.com", "coach").await;
    let member = common::create_profile(&pool, "member@example.com", "member").await;
    let program = common::create_program(&pool, coach, "engine", 0, Some(30), "published").await;
    let day = common::create_day(&pool, program, 1, "Intervals").await;
    common::create_day(&pool, program, 2, "Rest").await;
    let enrollment = common::create_enrollment(
        &pool,
        member,
        program,
        Some(Utc::now() + Duration::days(30)),
    )
    .await;
    sqlx::query("INSERT INTO progress_entries (enrollment_id, blueprint_id) VALUES ($1, $2)")
        .bind(enrollment)
        .bind(day)
        .execute(&pool)
        .await
        .unwrap();

    let server = make_server(pool);
    let response = server
        .get("/api/me/enrollments")
        .add_header("Authorization", common::bearer(&member, "member@example.com"))
        .await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["program_slug"], "engine");
    assert_eq!(items[0]["completed_days"], 1);
    assert_eq!(items[0]["total_days"], 2);
    assert_eq!(items[0]["percent"], 50);
}

#[sqlx::test]
async fn test_my_orders_only_lists_own_orders(pool: PgPool) {
    let coach = common::create_profile(&pool, "coach@example.com", "coach").await;
    let buyer = common::create_profile(&pool, "buyer@example.com", "member").await;
    let other = common::create_profile(&pool, "other@example.com", "member").await;
    let program = common::create_program(&pool, coach, "engine", 29000, None, "published").await;
    common::create_paid_order(&pool, buyer, program, "20260101-aaaaaaaaaaaa", 29000).await;
    common::create_paid_order(&pool, other, program, "20260101-bbbbbbbbbbbb", 29000).await;

    let server = make_server(pool);
    let response = server
        .get("/api/me/orders")
        .add_header("Authorization", common::bearer(&buyer, "buyer@example.com"))
        .await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["order_number"], "20260101-aaaaaaaaaaaa");
    assert_eq!(items[0]["status"], "paid");
    assert_eq!(items[0]["program_title"], "Program engine");
}
