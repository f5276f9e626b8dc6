//! User entity model and DTOs.

use nexus_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar_path: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub pending_email: Option<String>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar_path: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub pending_email: Option<String>,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            city: user.city,
            avatar_path: user.avatar_path,
            role: user.role,
            email_verified: user.email_verified,
            pending_email: user.pending_email,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user. Accounts start unverified and inactive.
#[derive(Debug)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// DTO for profile updates. Email is excluded: address changes go through
/// the pending-email confirmation flow.
#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}
