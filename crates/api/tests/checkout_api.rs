//! HTTP-level integration tests for the two-phase checkout.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{auth_token, body_json, seed_category, seed_keys, seed_product, send};
use nexus_db::repositories::{ProductKeyRepo, ProductRepo};
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_one(pool: &PgPool, keys: usize) -> i64 {
    let category = seed_category(pool, "Games", "games").await;
    let product = seed_product(pool, category, "G-1", "AAA Title", "aaa-title", 5999).await;
    if keys > 0 {
        seed_keys(pool, product, "KEY", keys).await;
    }
    product
}

async fn add_to_cart(app: Router, session: Uuid, product_id: i64) {
    let path = format!("/api/v1/cart/add/{product_id}");
    let response = send(app, Method::POST, &path, None, Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn start_checkout(app: Router, token: &str, session: Uuid) -> axum::response::Response {
    send(
        app,
        Method::POST,
        "/api/v1/checkout/start",
        Some(token),
        Some(session),
        None,
    )
    .await
}

/// The full storefront scenario: two free keys, a third cart add is
/// rejected, checkout-start succeeds with quantity 2, pay consumes both
/// keys, the order becomes paid, and the cart is cleared.
#[sqlx::test(migrations = "../db/migrations")]
async fn two_keys_full_purchase_flow(pool: PgPool) {
    let product = seed_one(&pool, 2).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(app.clone(), &pool, "buyer").await;
    let session = Uuid::new_v4();

    // Two units fit, the third is rejected.
    add_to_cart(app.clone(), session, product).await;
    add_to_cart(app.clone(), session, product).await;
    let path = format!("/api/v1/cart/add/{product}");
    let response = send(app.clone(), Method::POST, &path, None, Some(session), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Start: order created, keys reserved (free count drops, stock does not).
    let response = start_checkout(app.clone(), &token, session).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(json["data"]["status"], "new");
    assert_eq!(json["data"]["total_cents"], 2 * 5999);
    assert_eq!(json["data"]["items"][0]["quantity"], 2);

    assert_eq!(ProductRepo::free_key_count(&pool, product).await.unwrap(), 0);
    let row = ProductRepo::find_by_id(&pool, product).await.unwrap().unwrap();
    assert_eq!(row.stock, 2, "reservation must not consume stock");

    // Pay: both keys delivered, distinct, order paid.
    let path = format!("/api/v1/checkout/{order_id}/pay");
    let response = send(app.clone(), Method::POST, &path, Some(&token), Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "paid");
    assert_eq!(json["data"]["provider"], "demo");
    let keys = json["data"]["items"][0]["key_values"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);

    // Counters reflect the sale.
    let row = ProductRepo::find_by_id(&pool, product).await.unwrap().unwrap();
    assert_eq!(row.stock, 0);
    assert_eq!(row.sold_count, 2);

    // Cart cleared.
    let response = send(app.clone(), Method::GET, "/api/v1/cart", None, Some(session), None).await;
    let json = body_json(response).await;
    assert_eq!(json["lines"].as_array().unwrap().len(), 0);

    // Order detail replays the purchased keys.
    let path = format!("/api/v1/orders/{order_id}");
    let response = send(app, Method::GET, &path, Some(&token), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["items"][0]["key_values"].as_array().unwrap().len(),
        2
    );
}

/// Starting with an empty cart is a validation error.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_with_empty_cart_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = auth_token(app.clone(), &pool, "buyer").await;

    let response = start_checkout(app, &token, Uuid::new_v4()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Checkout requires authentication.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = send(
        app,
        Method::POST,
        "/api/v1/checkout/start",
        None,
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A line shortfall aborts the whole checkout: no order row is created
/// and nothing stays reserved.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_is_all_or_nothing_on_shortfall(pool: PgPool) {
    let category = seed_category(&pool, "Games", "games").await;
    let plenty = seed_product(&pool, category, "G-1", "Plenty", "plenty", 1000).await;
    seed_keys(&pool, plenty, "PL", 5).await;
    let scarce = seed_product(&pool, category, "G-2", "Scarce", "scarce", 2000).await;
    seed_keys(&pool, scarce, "SC", 1).await;

    let app = common::build_test_app(pool.clone());
    let token = auth_token(app.clone(), &pool, "buyer").await;
    let session = Uuid::new_v4();

    add_to_cart(app.clone(), session, plenty).await;
    add_to_cart(app.clone(), session, scarce).await;

    // The scarce product's only key disappears between cart add and start.
    let keys = ProductKeyRepo::list_by_product(&pool, scarce).await.unwrap();
    ProductKeyRepo::delete_unsold(&pool, keys[0].id).await.unwrap();

    let response = start_checkout(app, &token, session).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // No order, no reservations left behind.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(ProductRepo::free_key_count(&pool, plenty).await.unwrap(), 5);
}

/// Reservation at start closes the classic race: once one checkout holds
/// the last key, a second checkout cannot pass validation for it.
#[sqlx::test(migrations = "../db/migrations")]
async fn reserved_keys_are_invisible_to_other_checkouts(pool: PgPool) {
    let product = seed_one(&pool, 1).await;
    let app = common::build_test_app(pool.clone());

    let token_a = auth_token(app.clone(), &pool, "alice").await;
    let token_b = auth_token(app.clone(), &pool, "bob").await;
    let session_a = Uuid::new_v4();
    let session_b = Uuid::new_v4();

    // Both carts grab the last unit before either checks out.
    add_to_cart(app.clone(), session_a, product).await;
    add_to_cart(app.clone(), session_b, product).await;

    let response = start_checkout(app.clone(), &token_a, session_a).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Bob's start sees zero free keys and aborts cleanly.
    let response = start_checkout(app, &token_b, session_b).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Pay on someone else's order is indistinguishable from a missing order.
#[sqlx::test(migrations = "../db/migrations")]
async fn pay_is_owner_scoped(pool: PgPool) {
    let product = seed_one(&pool, 1).await;
    let app = common::build_test_app(pool.clone());

    let token_a = auth_token(app.clone(), &pool, "alice").await;
    let token_b = auth_token(app.clone(), &pool, "bob").await;
    let session = Uuid::new_v4();

    add_to_cart(app.clone(), session, product).await;
    let response = start_checkout(app.clone(), &token_a, session).await;
    let json = body_json(response).await;
    let order_id = json["data"]["id"].as_i64().unwrap();

    let path = format!("/api/v1/checkout/{order_id}/pay");
    let response = send(app, Method::POST, &path, Some(&token_b), None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Paying a paid order is a conflict, not a double allocation.
#[sqlx::test(migrations = "../db/migrations")]
async fn pay_twice_is_rejected(pool: PgPool) {
    let product = seed_one(&pool, 1).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(app.clone(), &pool, "buyer").await;
    let session = Uuid::new_v4();

    add_to_cart(app.clone(), session, product).await;
    let response = start_checkout(app.clone(), &token, session).await;
    let json = body_json(response).await;
    let order_id = json["data"]["id"].as_i64().unwrap();

    let path = format!("/api/v1/checkout/{order_id}/pay");
    let response = send(app.clone(), Method::POST, &path, Some(&token), Some(session), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app, Method::POST, &path, Some(&token), Some(session), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let row = ProductRepo::find_by_id(&pool, product).await.unwrap().unwrap();
    assert_eq!(row.sold_count, 1, "second pay must not allocate again");
}

/// Cancel releases the reservation and the keys become sellable again.
#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_releases_reservations(pool: PgPool) {
    let product = seed_one(&pool, 1).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(app.clone(), &pool, "buyer").await;
    let session = Uuid::new_v4();

    add_to_cart(app.clone(), session, product).await;
    let response = start_checkout(app.clone(), &token, session).await;
    let json = body_json(response).await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(ProductRepo::free_key_count(&pool, product).await.unwrap(), 0);

    let path = format!("/api/v1/checkout/{order_id}/cancel");
    let response = send(app.clone(), Method::POST, &path, Some(&token), None, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(ProductRepo::free_key_count(&pool, product).await.unwrap(), 1);

    // A canceled order cannot be paid.
    let path = format!("/api/v1/checkout/{order_id}/pay");
    let response = send(app, Method::POST, &path, Some(&token), None, None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Orders are listed newest first and scoped to their owner.
#[sqlx::test(migrations = "../db/migrations")]
async fn order_listing_is_owner_scoped(pool: PgPool) {
    let product = seed_one(&pool, 3).await;
    let app = common::build_test_app(pool.clone());

    let token_a = auth_token(app.clone(), &pool, "alice").await;
    let token_b = auth_token(app.clone(), &pool, "bob").await;
    let session = Uuid::new_v4();

    add_to_cart(app.clone(), session, product).await;
    start_checkout(app.clone(), &token_a, session).await;

    let response = send(app.clone(), Method::GET, "/api/v1/orders", Some(&token_a), None, None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = send(app, Method::GET, "/api/v1/orders", Some(&token_b), None, None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}
