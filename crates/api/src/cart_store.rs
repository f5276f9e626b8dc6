//! In-process session cart storage.
//!
//! Carts are ephemeral per-session state: an explicit quantity map keyed by
//! an opaque session key, held in memory and dropped after a TTL. Clients
//! carry the key in the `x-session-key` header; a missing or unparseable
//! header denotes a fresh (empty) session, and mutating calls return the
//! key so the client can keep it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use nexus_core::cart::Cart;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Header clients use to carry their cart session key.
pub const SESSION_KEY_HEADER: &str = "x-session-key";

/// One session's cart plus its last-touch time for TTL pruning.
struct CartEntry {
    cart: Cart,
    touched_at: Instant,
}

/// Manages all live session carts.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct CartStore {
    entries: RwLock<HashMap<Uuid, CartEntry>>,
}

impl CartStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Clone the cart for a session (empty when the session is unknown).
    ///
    /// Refreshes the TTL of an existing entry.
    pub async fn snapshot(&self, key: Uuid) -> Cart {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.touched_at = Instant::now();
                entry.cart.clone()
            }
            None => Cart::new(),
        }
    }

    /// Run a mutation against a session's cart, creating the entry if the
    /// session is new. Returns whatever the closure returns.
    pub async fn with_cart<T>(&self, key: Uuid, f: impl FnOnce(&mut Cart) -> T) -> T {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key).or_insert_with(|| CartEntry {
            cart: Cart::new(),
            touched_at: Instant::now(),
        });
        entry.touched_at = Instant::now();
        f(&mut entry.cart)
    }

    /// Drop a session's cart entirely (checkout completion).
    pub async fn clear(&self, key: Uuid) {
        self.entries.write().await.remove(&key);
    }

    /// Remove entries idle for longer than `ttl`. Returns how many were
    /// dropped.
    pub async fn prune_idle(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.touched_at.elapsed() <= ttl);
        before - entries.len()
    }

    /// Number of live sessions (for logging).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Session key extracted from the `x-session-key` header.
///
/// A missing or invalid header mints a fresh key, which handlers return in
/// their response payload so the client can persist it.
#[derive(Debug, Clone, Copy)]
pub struct SessionKey(pub Uuid);

impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(SESSION_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Uuid>().ok())
            .unwrap_or_else(Uuid::new_v4);
        Ok(SessionKey(key))
    }
}
