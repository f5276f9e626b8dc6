//! Periodic release of stale checkout reservations.
//!
//! Checkout-start reserves keys for the order; if the buyer never pays,
//! those reservations would hold inventory forever. This task cancels
//! unpaid orders older than the configured hold window, which also frees
//! their keys. Runs on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use nexus_db::repositories::OrderRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the stale-checkout sweep loop.
///
/// Cancels `new` orders older than `hold_mins` minutes and releases their
/// key reservations. Runs until `cancel` is triggered.
pub async fn run(pool: PgPool, hold_mins: i64, cancel: CancellationToken) {
    tracing::info!(
        hold_mins,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Checkout expiry job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Checkout expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::minutes(hold_mins);
                match OrderRepo::release_stale(&pool, cutoff).await {
                    Ok(released) => {
                        if released > 0 {
                            tracing::info!(released, "Checkout expiry: canceled stale orders");
                        } else {
                            tracing::debug!("Checkout expiry: nothing to release");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Checkout expiry: sweep failed");
                    }
                }
            }
        }
    }
}
