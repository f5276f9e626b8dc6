//! Shared harness for HTTP-level integration tests.
//!
//! `build_test_app` mirrors the router construction in `main.rs` so tests
//! exercise the same middleware stack (CORS, request ID, timeout, tracing,
//! panic recovery) that production uses. Request helpers drive the app
//! through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

use nexus_api::auth::jwt::JwtConfig;
use nexus_api::auth::password::hash_password;
use nexus_api::cart_store::{CartStore, SESSION_KEY_HEADER};
use nexus_api::config::ServerConfig;
use nexus_api::routes;
use nexus_api::state::AppState;
use nexus_db::models::user::{CreateUser, User};
use nexus_db::repositories::{CategoryRepo, ProductKeyRepo, ProductRepo, UserRepo};

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        media_root: std::env::temp_dir().join("nexus-test-media"),
        public_base_url: "http://localhost:3000".to_string(),
        checkout_hold_mins: 30,
        cart_ttl_mins: 120,
        jwt: test_jwt_config(),
    }
}

/// The JWT config the test app runs with; tests reuse it to mint email
/// tokens the way the handlers would.
pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 7,
        email_token_expiry_hours: 48,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();

    let state = AppState {
        pool,
        config: Arc::new(config),
        carts: Arc::new(CartStore::new()),
        mailer: None,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Flexible request builder used by the thin wrappers below.
pub async fn send(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    session: Option<Uuid>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(session) = session {
        builder = builder.header(SESSION_KEY_HEADER, session.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };
    app.oneshot(request).await.expect("request should succeed")
}

pub async fn get(app: Router, path: &str) -> Response {
    send(app, Method::GET, path, None, None, None).await
}

pub async fn get_auth(app: Router, path: &str, token: &str) -> Response {
    send(app, Method::GET, path, Some(token), None, None).await
}

pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, path, None, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, path, Some(token), None, Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, path, Some(token), None, Some(body)).await
}

pub async fn delete_auth(app: Router, path: &str, token: &str) -> Response {
    send(app, Method::DELETE, path, Some(token), None, None).await
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

/// Create a verified, active test user directly in the database. Returns
/// the user row plus the plaintext password used.
pub async fn create_test_user(pool: &PgPool, username: &str) -> (User, String) {
    let password = "test_password_123!";
    let hashed = hash_password(password).expect("hashing should succeed");
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password_hash: hashed,
        phone: None,
        city: None,
    };
    let user = UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed");
    UserRepo::mark_email_verified(pool, user.id)
        .await
        .expect("verification should succeed");
    let user = UserRepo::find_by_id(pool, user.id)
        .await
        .expect("reload should succeed")
        .expect("user should exist");
    (user, password.to_string())
}

/// Create a verified admin user. Returns the user row plus the password.
pub async fn create_test_admin(pool: &PgPool, username: &str) -> (User, String) {
    let (user, password) = create_test_user(pool, username).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
        .expect("role update should succeed");
    let user = UserRepo::find_by_id(pool, user.id)
        .await
        .expect("reload should succeed")
        .expect("user should exist");
    (user, password)
}

/// Log in a user via the API and return the JSON response containing
/// `access_token`, `refresh_token`, and `user` info.
pub async fn login_user(app: Router, username: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Create a user and return a ready-to-use access token for them.
pub async fn auth_token(app: Router, pool: &PgPool, username: &str) -> String {
    let (_user, password) = create_test_user(pool, username).await;
    let json = login_user(app, username, &password).await;
    json["access_token"].as_str().expect("token").to_string()
}

/// Seed a category and return its id.
pub async fn seed_category(pool: &PgPool, name: &str, slug: &str) -> i64 {
    use nexus_db::models::category::CreateCategory;
    let input = CreateCategory {
        name: name.to_string(),
        slug: None,
    };
    CategoryRepo::create(pool, &input, slug)
        .await
        .expect("category creation should succeed")
        .id
}

/// Seed an available product and return its id.
pub async fn seed_product(
    pool: &PgPool,
    category_id: i64,
    code: &str,
    name: &str,
    slug: &str,
    price_cents: i64,
) -> i64 {
    use nexus_db::models::product::CreateProduct;
    let input = CreateProduct {
        code: code.to_string(),
        category_id,
        name: name.to_string(),
        slug: None,
        description: None,
        price_cents,
        is_available: Some(true),
    };
    ProductRepo::create(pool, &input, slug)
        .await
        .expect("product creation should succeed")
        .id
}

/// Import `count` keys for a product (values `{code_prefix}-1`, ...).
pub async fn seed_keys(pool: &PgPool, product_id: i64, code_prefix: &str, count: usize) {
    let values: Vec<String> = (1..=count).map(|i| format!("{code_prefix}-{i}")).collect();
    ProductKeyRepo::import(pool, product_id, &values)
        .await
        .expect("key import should succeed");
}
