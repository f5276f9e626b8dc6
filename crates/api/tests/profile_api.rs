//! HTTP-level integration tests for the profile, password, avatar, and
//! email-change endpoints.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use common::{
    body_json, get_auth, login_user, post_json, post_json_auth, put_json_auth, send,
};
use nexus_api::auth::email_token::{issue_email_token, EmailTokenPurpose};
use nexus_db::repositories::UserRepo;
use sqlx::PgPool;
use tower::ServiceExt;

/// GET /profile returns the caller's safe representation.
#[sqlx::test(migrations = "../db/migrations")]
async fn get_profile_returns_caller(pool: PgPool) {
    let (user, password) = common::create_test_user(&pool, "me").await;
    let app = common::build_test_app(pool);
    let token = login_user(app.clone(), "me", &password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = get_auth(app, "/api/v1/profile", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], user.id);
    assert_eq!(json["data"]["email"], "me@test.com");
    assert!(json["data"]["password_hash"].is_null(), "hash must not leak");
}

/// Profile updates apply username/phone/city and never touch the email.
#[sqlx::test(migrations = "../db/migrations")]
async fn update_profile_excludes_email(pool: PgPool) {
    let (user, password) = common::create_test_user(&pool, "editor").await;
    let app = common::build_test_app(pool.clone());
    let token = login_user(app.clone(), "editor", &password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let body = serde_json::json!({ "phone": "+371 20000000", "city": "Riga" });
    let response = put_json_auth(app, "/api/v1/profile", &token, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["phone"], "+371 20000000");
    assert_eq!(json["data"]["city"], "Riga");

    let row = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(row.email, "editor@test.com", "email is not updatable here");
}

/// Password change requires the current password, then revokes every
/// refresh session.
#[sqlx::test(migrations = "../db/migrations")]
async fn change_password_revokes_sessions(pool: PgPool) {
    let (_user, password) = common::create_test_user(&pool, "rotator").await;
    let app = common::build_test_app(pool);

    let login = login_user(app.clone(), "rotator", &password).await;
    let token = login["access_token"].as_str().unwrap().to_string();
    let refresh_token = login["refresh_token"].as_str().unwrap().to_string();

    // Wrong current password is refused.
    let body = serde_json::json!({
        "current_password": "not-it",
        "new_password": "brand-new-password",
    });
    let response = post_json_auth(app.clone(), "/api/v1/profile/password", &token, body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = serde_json::json!({
        "current_password": password,
        "new_password": "brand-new-password",
    });
    let response = post_json_auth(app.clone(), "/api/v1/profile/password", &token, body).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Old refresh token is dead; the new password logs in.
    let body = serde_json::json!({ "refresh_token": refresh_token });
    let response = post_json(app.clone(), "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    login_user(app, "rotator", "brand-new-password").await;
}

/// Build a multipart request with a single file field.
fn multipart_request(
    path: &str,
    token: &str,
    field: &str,
    filename: &str,
    content: &[u8],
) -> Request<Body> {
    let boundary = "x-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}

/// Avatar upload stores the file and answers with the pinned
/// `{"status","url"}` shape; a missing file field is a bare 400.
#[sqlx::test(migrations = "../db/migrations")]
async fn avatar_upload_contract(pool: PgPool) {
    let (user, password) = common::create_test_user(&pool, "pictured").await;
    let app = common::build_test_app(pool.clone());
    let token = login_user(app.clone(), "pictured", &password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let request = multipart_request(
        "/api/v1/profile/avatar",
        &token,
        "avatar",
        "me.png",
        b"\x89PNG fake image bytes",
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    let url = json["url"].as_str().unwrap();
    assert!(url.contains("/media/avatars/"), "unexpected url: {url}");

    let row = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(row.avatar_path.unwrap().starts_with("avatars/"));

    // Wrong field name means no file: the pinned error shape.
    let request = multipart_request(
        "/api/v1/profile/avatar",
        &token,
        "not_avatar",
        "me.png",
        b"\x89PNG",
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

/// The email-change flow: request stores the pending address and clears
/// the verified flag; confirmation promotes it exactly once.
#[sqlx::test(migrations = "../db/migrations")]
async fn email_change_flow(pool: PgPool) {
    let (user, password) = common::create_test_user(&pool, "mover").await;
    let app = common::build_test_app(pool.clone());
    let token = login_user(app.clone(), "mover", &password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let body = serde_json::json!({ "new_email": "mover-new@test.com" });
    let response = post_json_auth(app.clone(), "/api/v1/email/change", &token, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["pending_email"], "mover-new@test.com");

    let row = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(row.pending_email.as_deref(), Some("mover-new@test.com"));
    assert!(!row.email_verified, "verified flag clears until confirmation");

    // Confirm with the same token the handler linked.
    let confirm_token = issue_email_token(
        &row,
        EmailTokenPurpose::ChangeEmail,
        &common::test_jwt_config(),
    )
    .unwrap();
    let path = format!("/api/v1/email/change/confirm/{}/{confirm_token}", user.id);
    let response = send(app.clone(), Method::GET, &path, None, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let row = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(row.email, "mover-new@test.com");
    assert_eq!(row.pending_email, None);
    assert!(row.email_verified);

    // Replaying the consumed link changes nothing.
    let response = send(app, Method::GET, &path, None, None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Changing to an address another account owns is refused up front.
#[sqlx::test(migrations = "../db/migrations")]
async fn email_change_to_taken_address_conflicts(pool: PgPool) {
    common::create_test_user(&pool, "resident").await;
    let (_user, password) = common::create_test_user(&pool, "mover").await;
    let app = common::build_test_app(pool);
    let token = login_user(app.clone(), "mover", &password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let body = serde_json::json!({ "new_email": "resident@test.com" });
    let response = post_json_auth(app, "/api/v1/email/change", &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
