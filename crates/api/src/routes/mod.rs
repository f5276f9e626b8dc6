pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /                                  home (products + categories)
/// /catalog                           filtered/sorted listing
/// /products/{slug}                   product detail
///
/// /cart                              view cart
/// /cart/add/{product_id}             add one unit (POST)
/// /cart/remove/{product_id}          remove a line (POST)
///
/// /auth/register                     register (public)
/// /auth/verify-email/{uid}/{token}   activate account (public)
/// /auth/login                        login (public)
/// /auth/refresh                      refresh (public)
/// /auth/logout                       logout (requires auth)
///
/// /profile                           get, update (requires auth)
/// /profile/password                  change password (POST)
/// /profile/avatar                    upload avatar (POST multipart)
/// /email/change                      request email change (POST)
/// /email/change/confirm/{uid}/{token} confirm email change (public)
///
/// /checkout/start                    create order + reserve keys (POST)
/// /checkout/{order_id}/pay           demo pay: allocate keys (POST)
/// /checkout/{order_id}/cancel        release reservations (POST)
/// /orders                            own orders (GET)
/// /orders/{id}                       own order detail (GET)
///
/// /admin/categories                  list, create (admin only)
/// /admin/categories/{id}             update, delete
/// /admin/products                    create
/// /admin/products/{id}               update, delete
/// /admin/products/{id}/image         upload image (multipart)
/// /admin/products/{id}/keys          list, create
/// /admin/products/{id}/keys/import   bulk import
/// /admin/keys/{id}                   update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Public storefront pages.
        .merge(catalog::router())
        // Session cart.
        .nest("/cart", cart::router())
        // Registration, verification, login.
        .nest("/auth", auth::router())
        // Account profile.
        .nest("/profile", profile::profile_router())
        // Email-change confirmation flow.
        .nest("/email/change", profile::email_router())
        // Two-phase checkout.
        .nest("/checkout", checkout::checkout_router())
        // Order history.
        .nest("/orders", checkout::orders_router())
        // Management API.
        .nest("/admin", admin::router())
}
