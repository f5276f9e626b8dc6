//! Route definitions for the management API (admin role required).

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /categories                 -> list_categories
/// POST   /categories                 -> create_category
/// PUT    /categories/{id}            -> update_category
/// DELETE /categories/{id}            -> delete_category
///
/// POST   /products                   -> create_product
/// PUT    /products/{id}              -> update_product
/// DELETE /products/{id}              -> delete_product
/// POST   /products/{id}/image        -> upload_product_image (multipart)
///
/// GET    /products/{id}/keys         -> list_keys
/// POST   /products/{id}/keys         -> create_key
/// POST   /products/{id}/keys/import  -> import_keys (bulk)
/// PUT    /keys/{id}                  -> update_key (legacy sold toggle)
/// DELETE /keys/{id}                  -> delete_key (unsold only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route(
            "/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/products/{id}/image", post(admin::upload_product_image))
        .route(
            "/products/{id}/keys",
            get(admin::list_keys).post(admin::create_key),
        )
        .route("/products/{id}/keys/import", post(admin::import_keys))
        .route(
            "/keys/{id}",
            put(admin::update_key).delete(admin::delete_key),
        )
}
