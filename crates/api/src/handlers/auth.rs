//! Handlers for registration, email verification, login, refresh, logout.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use nexus_core::error::CoreError;
use nexus_core::types::DbId;
use nexus_db::models::session::CreateSession;
use nexus_db::models::user::{CreateUser, User, UserResponse};
use nexus_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::email_token::{check_email_token, issue_email_token, EmailTokenPurpose};
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "username must be 3-32 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "city must be at most 100 characters"))]
    pub city: Option<String>,
}

/// Response body for a successful registration: the account exists but
/// stays inactive until the emailed verification link is followed.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub email: String,
    pub verification_sent: bool,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login, refresh, and
/// email verification.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an inactive account and send the verification link. Responds 201
/// with the address the link went to.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisterResponse>>)> {
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::Internal(format!("Password hashing error: {e}")))?;

    let create = CreateUser {
        username: input.username,
        email: input.email,
        password_hash,
        phone: input.phone,
        city: input.city,
    };
    // Unique violations on username/email surface as 409 via the sqlx
    // error classifier.
    let user = UserRepo::create(&state.pool, &create).await?;

    let token = issue_email_token(&user, EmailTokenPurpose::VerifyEmail, &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("Token generation error: {e}")))?;
    let verify_url = format!(
        "{}/api/v1/auth/verify-email/{}/{}",
        state.config.public_base_url, user.id, token
    );

    let verification_sent = deliver_account_email(
        &state,
        EmailTokenPurpose::VerifyEmail,
        &user.email,
        &user.username,
        &verify_url,
    )
    .await;

    tracing::info!(user_id = user.id, "User registered, awaiting verification");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RegisterResponse {
                email: user.email,
                verification_sent,
            },
        }),
    ))
}

/// GET /api/v1/auth/verify-email/{uid}/{token}
///
/// Activate the account on a valid token and log the user in. Invalid,
/// expired, or already-consumed tokens change nothing and yield 401.
pub async fn verify_email(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(DbId, String)>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Verification link is invalid or has expired".into(),
        ))
    };

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(invalid)?;

    if !check_email_token(&token, &user, EmailTokenPurpose::VerifyEmail, &state.config.jwt) {
        return Err(invalid());
    }

    // The email_verified = false guard makes the flip exactly-once even if
    // two copies of the link race each other.
    if !UserRepo::mark_email_verified(&state.pool, user.id).await? {
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, "Email verified, account activated");

    // Re-read so the response reflects the activated state.
    let user = UserRepo::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(invalid)?;
    let response = create_auth_response(&state, user).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find user by username.
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    // 2. Check if the account is active (inactive = email not verified).
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is not activated. Check your email for the verification link.".into(),
        )));
    }

    // 3. Check if the account is temporarily locked.
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    // 4. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 5. On failure: increment counter, lock if threshold exceeded.
        UserRepo::increment_failed_login(&state.pool, user.id).await?;

        let new_count = user.failed_login_count + 1;
        if new_count >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    // 6. On success: reset failed count, set last_login_at.
    UserRepo::record_successful_login(&state.pool, user.id).await?;

    // 7. Generate tokens and create session.
    let response = create_auth_response(&state, user).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Hash the provided refresh token.
    let token_hash = hash_refresh_token(&input.refresh_token);

    // 2. Find matching active session.
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // 3. Revoke old session (token rotation).
    SessionRepo::revoke(&state.pool, session.id).await?;

    // 4. Find user.
    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 5. Generate new tokens and create new session.
    let response = create_auth_response(&state, user).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions for the authenticated user. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate access + refresh tokens, persist a session row, and build the
/// response.
pub(crate) async fn create_auth_response(
    state: &AppState,
    user: User,
) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();

    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    let session_input = CreateSession {
        user_id: user.id,
        refresh_token_hash: refresh_hash,
        expires_at,
    };
    SessionRepo::create(&state.pool, &session_input).await?;

    let expires_in = state.config.jwt.access_token_expiry_mins * 60;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in,
        user: UserResponse::from(user),
    })
}

/// Send an account email, or log the URL when SMTP is not configured.
///
/// Delivery failures are logged but never fail the surrounding request;
/// the account flow itself has already committed.
pub(crate) async fn deliver_account_email(
    state: &AppState,
    purpose: EmailTokenPurpose,
    to_email: &str,
    username: &str,
    url: &str,
) -> bool {
    let Some(mailer) = &state.mailer else {
        tracing::info!(to = to_email, url, "Email delivery not configured; confirmation link logged");
        return false;
    };

    let result = match purpose {
        EmailTokenPurpose::VerifyEmail => mailer.send_verification(to_email, username, url).await,
        EmailTokenPurpose::ChangeEmail => mailer.send_email_change(to_email, username, url).await,
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, to = to_email, "Failed to send account email");
            false
        }
    }
}
