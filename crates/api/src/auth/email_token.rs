//! Signed, time-limited tokens for email verification and email-change
//! confirmation.
//!
//! Tokens are HS256 JWTs bound to the user's primary key and scoped to a
//! purpose. Each token also carries a SHA-256 fingerprint of the mutable
//! account state (email, verified flag, pending email): consuming the
//! token mutates that state, so every previously issued copy stops
//! validating. This gives the exactly-once semantics the account flows
//! rely on without any server-side token storage.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use nexus_core::types::DbId;
use nexus_db::models::user::User;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::jwt::JwtConfig;

/// What an email token is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTokenPurpose {
    /// Activate a freshly registered account.
    VerifyEmail,
    /// Confirm a pending email-address change.
    ChangeEmail,
}

impl EmailTokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify_email",
            Self::ChangeEmail => "change_email",
        }
    }
}

/// Claims carried by an email token.
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    /// Subject -- the user's internal database id.
    sub: DbId,
    /// Token purpose (`verify_email` or `change_email`).
    purpose: String,
    /// Account-state fingerprint at issue time.
    fpr: String,
    /// Expiration time (UTC Unix timestamp).
    exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    iat: i64,
}

/// Fingerprint of the account state a token is allowed to transition.
///
/// Any change to email, verified flag, or pending email invalidates all
/// previously issued tokens.
fn state_fingerprint(user: &User) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.id.to_le_bytes());
    hasher.update([0x1f]);
    hasher.update(user.email.as_bytes());
    hasher.update([0x1f]);
    hasher.update([u8::from(user.email_verified)]);
    hasher.update([0x1f]);
    if let Some(pending) = &user.pending_email {
        hasher.update(pending.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Issue a token for the given user and purpose.
///
/// Must be called with the user's *current* row (after any state update
/// the flow just performed), since the fingerprint is computed from it.
pub fn issue_email_token(
    user: &User,
    purpose: EmailTokenPurpose,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = EmailClaims {
        sub: user.id,
        purpose: purpose.as_str().to_string(),
        fpr: state_fingerprint(user),
        exp: now + config.email_token_expiry_hours * 3600,
        iat: now,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check a token against the user's current row.
///
/// Returns `true` only when the signature and expiry are valid, the token
/// was issued for this user and purpose, and the account state has not
/// changed since issue (i.e. the token has not been consumed).
pub fn check_email_token(
    token: &str,
    user: &User,
    purpose: EmailTokenPurpose,
    config: &JwtConfig,
) -> bool {
    let decoded = decode::<EmailClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    );

    match decoded {
        Ok(data) => {
            let claims = data.claims;
            claims.sub == user.id
                && claims.purpose == purpose.as_str()
                && claims.fpr == state_fingerprint(user)
        }
        Err(_) => false,
    }
}
