//! Route definitions for the account profile and the email-change flow.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/profile`.
///
/// ```text
/// GET  /          -> get_profile
/// PUT  /          -> update_profile
/// POST /password  -> change_password
/// POST /avatar    -> upload_avatar (multipart)
/// ```
pub fn profile_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/password", post(profile::change_password))
        .route("/avatar", post(profile::upload_avatar))
}

/// Routes mounted at `/email/change`.
///
/// ```text
/// POST /                       -> request_email_change
/// GET  /confirm/{uid}/{token}  -> confirm_email_change
/// ```
pub fn email_router() -> Router<AppState> {
    Router::new()
        .route("/", post(profile::request_email_change))
        .route("/confirm/{uid}/{token}", get(profile::confirm_email_change))
}
