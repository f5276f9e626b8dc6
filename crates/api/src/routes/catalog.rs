//! Route definitions for the public storefront pages.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Routes mounted at the `/api/v1` root.
///
/// ```text
/// GET /                -> home (featured products + categories)
/// GET /catalog         -> filtered/sorted listing
/// GET /products/{slug} -> product detail
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::home))
        .route("/catalog", get(catalog::list_catalog))
        .route("/products/{slug}", get(catalog::product_detail))
}
