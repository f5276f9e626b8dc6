//! Route definitions for checkout and the order read API.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::checkout;
use crate::state::AppState;

/// Routes mounted at `/checkout`.
///
/// ```text
/// POST /start              -> start (create order + reserve keys)
/// POST /{order_id}/pay     -> pay (demo stub; allocate keys)
/// POST /{order_id}/cancel  -> cancel (release reservations)
/// ```
pub fn checkout_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(checkout::start))
        .route("/{order_id}/pay", post(checkout::pay))
        .route("/{order_id}/cancel", post(checkout::cancel))
}

/// Routes mounted at `/orders`.
///
/// ```text
/// GET /      -> list_orders (own orders)
/// GET /{id}  -> get_order (own order with items/keys)
/// ```
pub fn orders_router() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::list_orders))
        .route("/{id}", get(checkout::get_order))
}
