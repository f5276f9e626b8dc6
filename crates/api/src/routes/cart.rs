//! Route definitions for the session cart.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::cart;
use crate::state::AppState;

/// Routes mounted at `/cart`.
///
/// ```text
/// GET  /                     -> view_cart
/// POST /add/{product_id}     -> add_to_cart
/// POST /remove/{product_id}  -> remove_from_cart
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::view_cart))
        .route("/add/{product_id}", post(cart::add_to_cart))
        .route("/remove/{product_id}", post(cart::remove_from_cart))
}
