//! Handlers for the account profile: profile read/update, password change,
//! avatar upload, and the pending-email change flow.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nexus_core::error::CoreError;
use nexus_core::types::DbId;
use nexus_db::models::user::{UpdateProfile, User, UserResponse};
use nexus_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::email_token::{check_email_token, issue_email_token, EmailTokenPurpose};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::deliver_account_email;
use crate::media;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /profile/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request body for `POST /email/change`.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailChangeRequest {
    #[validate(email(message = "invalid email address"))]
    pub new_email: String,
}

/// Response body for `POST /email/change`.
#[derive(Debug, Serialize)]
pub struct EmailChangeResponse {
    pub pending_email: String,
    pub confirmation_sent: bool,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Load the caller's full user row or fail with 401 (the account may have
/// been deleted since the token was issued).
async fn load_user(state: &AppState, user_id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))
}

/// GET /api/v1/profile
pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PUT /api/v1/profile
///
/// Update username / phone / city. Email is deliberately not updatable
/// here; address changes go through the confirmation flow below.
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfile>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if let Some(username) = &input.username {
        if username.len() < 3 || username.len() > 32 {
            return Err(AppError::Core(CoreError::Validation(
                "username must be 3-32 characters".into(),
            )));
        }
    }

    let user = UserRepo::update_profile(&state.pool, auth.user_id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/v1/profile/password
///
/// Verify the current password, store the new hash, and revoke every
/// refresh session. Returns 204 No Content.
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = load_user(&state, auth.user_id).await?;

    let current_valid = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let new_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::Internal(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &new_hash).await?;

    // Existing refresh tokens die with the old password.
    SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, "Password changed, sessions revoked");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/profile/avatar
///
/// Multipart avatar upload. The `{"status", "url"}` response shape (and
/// the bare-400 error form) is part of the public contract.
pub async fn upload_avatar(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("avatar") {
            let filename = field.file_name().unwrap_or("avatar.png").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((filename, data.to_vec()));
        }
    }

    let Some((filename, data)) = file else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error" })),
        )
            .into_response());
    };

    let path = match media::save_upload(
        &state.config.media_root,
        media::AVATARS_PREFIX,
        &filename,
        &data,
    )
    .await
    {
        Ok(path) => path,
        Err(media::MediaError::UnsupportedExtension(_)) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error" })),
            )
                .into_response());
        }
        Err(media::MediaError::Io(e)) => {
            return Err(AppError::Internal(format!("Avatar write failed: {e}")));
        }
    };

    UserRepo::update_avatar(&state.pool, auth.user_id, &path).await?;

    tracing::info!(user_id = auth.user_id, path, "Avatar uploaded");

    let url = media::public_url(&state.config.public_base_url, &path);
    Ok(Json(json!({ "status": "ok", "url": url })).into_response())
}

// ---------------------------------------------------------------------------
// Email change flow
// ---------------------------------------------------------------------------

/// POST /api/v1/email/change
///
/// Store the unconfirmed new address (clearing the verified flag) and send
/// the confirmation link to it.
pub async fn request_email_change(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EmailChangeRequest>,
) -> AppResult<Json<DataResponse<EmailChangeResponse>>> {
    input.validate()?;

    let user = load_user(&state, auth.user_id).await?;
    if input.new_email == user.email {
        return Err(AppError::Core(CoreError::Validation(
            "New email is the same as the current one".into(),
        )));
    }
    // Fail early if the address already belongs to an account. The unique
    // constraint still guards the race at confirmation time.
    if UserRepo::find_by_email(&state.pool, &input.new_email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "Email address is already in use".into(),
        )));
    }

    UserRepo::set_pending_email(&state.pool, user.id, &input.new_email).await?;

    // Re-read so the token fingerprint covers the pending address.
    let user = load_user(&state, auth.user_id).await?;
    let token = issue_email_token(&user, EmailTokenPurpose::ChangeEmail, &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("Token generation error: {e}")))?;
    let confirm_url = format!(
        "{}/api/v1/email/change/confirm/{}/{}",
        state.config.public_base_url, user.id, token
    );

    let confirmation_sent = deliver_account_email(
        &state,
        EmailTokenPurpose::ChangeEmail,
        &input.new_email,
        &user.username,
        &confirm_url,
    )
    .await;

    tracing::info!(user_id = user.id, "Email change requested");

    Ok(Json(DataResponse {
        data: EmailChangeResponse {
            pending_email: input.new_email,
            confirmation_sent,
        },
    }))
}

/// GET /api/v1/email/change/confirm/{uid}/{token}
///
/// Promote the pending address on a valid token. Invalid, expired, or
/// already-consumed tokens change nothing and yield 401.
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(DbId, String)>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Confirmation link is invalid or has expired".into(),
        ))
    };

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(invalid)?;

    if !check_email_token(&token, &user, EmailTokenPurpose::ChangeEmail, &state.config.jwt) {
        return Err(invalid());
    }

    // Guarded by pending_email IS NOT NULL; a lost race on the unique
    // email constraint surfaces as 409 via the sqlx classifier.
    if !UserRepo::confirm_email_change(&state.pool, user.id).await? {
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, "Email change confirmed");

    let user = load_user(&state, user_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}
