//! Handlers for the session cart.
//!
//! The cart is a per-session quantity map held in [`crate::cart_store`];
//! nothing is persisted and no stock is reserved here. Prices are joined
//! against current product rows on every read, so totals always reflect
//! the current catalog. Availability is definitively re-checked (and
//! reserved) at checkout-start.

use axum::extract::{Path, State};
use axum::Json;
use nexus_core::cart::Cart;
use nexus_core::error::CoreError;
use nexus_core::types::DbId;
use nexus_db::repositories::ProductRepo;
use serde::Serialize;
use uuid::Uuid;

use crate::cart_store::SessionKey;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// One cart line joined with current product data.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: DbId,
    pub name: String,
    pub slug: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

/// The rendered cart. `session_key` echoes (or mints) the client's cart
/// session; clients send it back in the `x-session-key` header.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub session_key: Uuid,
    pub lines: Vec<CartLineView>,
    pub total_cents: i64,
}

/// Join cart lines against current product prices. Lines whose product
/// vanished from the catalog are dropped from view.
async fn build_view(state: &AppState, key: Uuid, cart: &Cart) -> AppResult<CartView> {
    let mut lines = Vec::with_capacity(cart.len());
    let mut total_cents = 0;

    for line in cart.lines() {
        let Some(product) = ProductRepo::find_by_id(&state.pool, line.product_id).await? else {
            continue;
        };
        let subtotal_cents = product.price_cents * line.quantity;
        total_cents += subtotal_cents;
        lines.push(CartLineView {
            product_id: product.id,
            name: product.name,
            slug: product.slug,
            price_cents: product.price_cents,
            quantity: line.quantity,
            subtotal_cents,
        });
    }

    Ok(CartView {
        session_key: key,
        lines,
        total_cents,
    })
}

/// GET /api/v1/cart
pub async fn view_cart(
    SessionKey(key): SessionKey,
    State(state): State<AppState>,
) -> AppResult<Json<CartView>> {
    let cart = state.carts.snapshot(key).await;
    Ok(Json(build_view(&state, key, &cart).await?))
}

/// POST /api/v1/cart/add/{product_id}
///
/// Add one unit. Rejected with 409 (and no state change) once the
/// session's quantity reaches the product's free-key count.
pub async fn add_to_cart(
    SessionKey(key): SessionKey,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
) -> AppResult<Json<CartView>> {
    let product = ProductRepo::find_by_id(&state.pool, product_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id: product_id,
        }))?;

    if !product.is_available {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "{} is not available for purchase",
            product.name
        ))));
    }

    let available = ProductRepo::free_key_count(&state.pool, product_id).await?;

    let added = state
        .carts
        .with_cart(key, |cart| {
            if cart.quantity(product_id) < available {
                cart.add_one(product_id);
                true
            } else {
                false
            }
        })
        .await;

    if !added {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Not enough keys in stock for {}",
            product.name
        ))));
    }

    let cart = state.carts.snapshot(key).await;
    Ok(Json(build_view(&state, key, &cart).await?))
}

/// POST /api/v1/cart/remove/{product_id}
///
/// Drop a line. Removing an absent line is a no-op, matching the
/// storefront's forgiving cart semantics.
pub async fn remove_from_cart(
    SessionKey(key): SessionKey,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
) -> AppResult<Json<CartView>> {
    state
        .carts
        .with_cart(key, |cart| cart.remove(product_id))
        .await;

    let cart = state.carts.snapshot(key).await;
    Ok(Json(build_view(&state, key, &cart).await?))
}
