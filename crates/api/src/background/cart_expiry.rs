//! Periodic pruning of idle session carts.
//!
//! Carts live only in process memory; this keeps abandoned sessions from
//! accumulating. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cart_store::CartStore;

/// How often the prune runs.
const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Run the cart pruning loop.
///
/// Drops carts idle for longer than `ttl`. Runs until `cancel` is
/// triggered.
pub async fn run(carts: Arc<CartStore>, ttl: Duration, cancel: CancellationToken) {
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = PRUNE_INTERVAL.as_secs(),
        "Cart expiry job started"
    );

    let mut interval = tokio::time::interval(PRUNE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cart expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                let dropped = carts.prune_idle(ttl).await;
                if dropped > 0 {
                    let remaining = carts.len().await;
                    tracing::info!(dropped, remaining, "Cart expiry: pruned idle sessions");
                } else {
                    tracing::debug!("Cart expiry: nothing to prune");
                }
            }
        }
    }
}
