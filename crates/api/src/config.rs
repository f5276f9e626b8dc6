use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have sensible defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory media files (product images, avatars) are written to and
    /// served from (default: `./media`).
    pub media_root: PathBuf,
    /// Externally visible base URL, used to build verification links and
    /// media URLs (default: `http://localhost:3000`).
    pub public_base_url: String,
    /// Minutes an unpaid order may hold its key reservations before the
    /// sweeper cancels it (default: `30`).
    pub checkout_hold_mins: i64,
    /// Minutes an idle session cart survives before being dropped
    /// (default: `120`).
    pub cart_ttl_mins: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MEDIA_ROOT`           | `./media`                  |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000`    |
    /// | `CHECKOUT_HOLD_MINS`   | `30`                       |
    /// | `CART_TTL_MINS`        | `120`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let media_root = PathBuf::from(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".into()));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let checkout_hold_mins: i64 = std::env::var("CHECKOUT_HOLD_MINS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CHECKOUT_HOLD_MINS must be a valid i64");

        let cart_ttl_mins: u64 = std::env::var("CART_TTL_MINS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("CART_TTL_MINS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            media_root,
            public_base_url,
            checkout_hold_mins,
            cart_ttl_mins,
            jwt,
        }
    }
}
