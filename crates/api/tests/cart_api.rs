//! HTTP-level integration tests for the session cart.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, seed_category, seed_keys, seed_product, send};
use nexus_db::models::product::UpdateProduct;
use nexus_db::repositories::ProductRepo;
use sqlx::PgPool;
use uuid::Uuid;

/// Seed one product with `keys` free keys; returns its id.
async fn seed_one(pool: &PgPool, keys: usize) -> i64 {
    let category = seed_category(pool, "Games", "games").await;
    let product = seed_product(pool, category, "G-1", "AAA Title", "aaa-title", 5999).await;
    if keys > 0 {
        seed_keys(pool, product, "KEY", keys).await;
    }
    product
}

async fn view_cart(app: axum::Router, session: Uuid) -> serde_json::Value {
    let response = send(app, Method::GET, "/api/v1/cart", None, Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn add(app: axum::Router, session: Uuid, product_id: i64) -> axum::response::Response {
    let path = format!("/api/v1/cart/add/{product_id}");
    send(app, Method::POST, &path, None, Some(session), None).await
}

/// Adds increment by exactly one and are rejected once the quantity
/// reaches the free-key count, leaving the cart unchanged.
#[sqlx::test(migrations = "../db/migrations")]
async fn add_respects_free_key_count(pool: PgPool) {
    let product = seed_one(&pool, 2).await;
    let app = common::build_test_app(pool);
    let session = Uuid::new_v4();

    let response = add(app.clone(), session, product).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["lines"][0]["quantity"], 1);

    let response = add(app.clone(), session, product).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Third unit exceeds the two free keys.
    let response = add(app.clone(), session, product).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = view_cart(app, session).await;
    assert_eq!(json["lines"][0]["quantity"], 2);
    assert_eq!(json["total_cents"], 2 * 5999);
}

/// Adding an unknown product is a 404; a withdrawn product is a 409.
#[sqlx::test(migrations = "../db/migrations")]
async fn add_checks_the_product(pool: PgPool) {
    let product = seed_one(&pool, 1).await;

    let update = UpdateProduct {
        code: None,
        category_id: None,
        name: None,
        slug: None,
        description: None,
        price_cents: None,
        is_available: Some(false),
    };
    ProductRepo::update(&pool, product, &update).await.unwrap();

    let app = common::build_test_app(pool);
    let session = Uuid::new_v4();

    let response = add(app.clone(), session, 999_999).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = add(app, session, product).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Removing a line deletes it; removing an absent line is a no-op.
#[sqlx::test(migrations = "../db/migrations")]
async fn remove_deletes_the_line(pool: PgPool) {
    let product = seed_one(&pool, 2).await;
    let app = common::build_test_app(pool);
    let session = Uuid::new_v4();

    add(app.clone(), session, product).await;

    let path = format!("/api/v1/cart/remove/{product}");
    let response = send(app.clone(), Method::POST, &path, None, Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["lines"].as_array().unwrap().len(), 0);
    assert_eq!(json["total_cents"], 0);

    // Absent line: still 200, still empty.
    let response = send(app, Method::POST, &path, None, Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Totals are recomputed from current prices on every view, so a price
/// change between add and view shows up immediately.
#[sqlx::test(migrations = "../db/migrations")]
async fn view_recomputes_totals_from_current_prices(pool: PgPool) {
    let product = seed_one(&pool, 2).await;
    let app = common::build_test_app(pool.clone());
    let session = Uuid::new_v4();

    add(app.clone(), session, product).await;
    let json = view_cart(app.clone(), session).await;
    assert_eq!(json["total_cents"], 5999);

    let update = UpdateProduct {
        code: None,
        category_id: None,
        name: None,
        slug: None,
        description: None,
        price_cents: Some(7999),
        is_available: None,
    };
    ProductRepo::update(&pool, product, &update).await.unwrap();

    let json = view_cart(app, session).await;
    assert_eq!(json["lines"][0]["price_cents"], 7999);
    assert_eq!(json["total_cents"], 7999);
}

/// Carts are isolated per session key.
#[sqlx::test(migrations = "../db/migrations")]
async fn carts_are_session_isolated(pool: PgPool) {
    let product = seed_one(&pool, 5).await;
    let app = common::build_test_app(pool);

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    add(app.clone(), alice, product).await;
    add(app.clone(), alice, product).await;
    add(app.clone(), bob, product).await;

    let json = view_cart(app.clone(), alice).await;
    assert_eq!(json["lines"][0]["quantity"], 2);

    let json = view_cart(app, bob).await;
    assert_eq!(json["lines"][0]["quantity"], 1);
}

/// A request without a session key gets a fresh empty cart and a minted
/// key in the response.
#[sqlx::test(migrations = "../db/migrations")]
async fn missing_session_key_mints_one(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = send(app, Method::GET, "/api/v1/cart", None, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["session_key"].as_str().unwrap().parse::<Uuid>().is_ok());
    assert_eq!(json["lines"].as_array().unwrap().len(), 0);
}
