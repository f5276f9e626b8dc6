use std::sync::Arc;

use crate::cart_store::CartStore;
use crate::config::ServerConfig;
use crate::mailer::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: nexus_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// In-process session cart store.
    pub carts: Arc<CartStore>,
    /// SMTP mailer; `None` when `SMTP_HOST` is unset, in which case
    /// verification links are logged instead of emailed.
    pub mailer: Option<Arc<Mailer>>,
}
