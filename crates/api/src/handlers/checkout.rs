//! Handlers for the two-phase checkout and the order read API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use nexus_core::error::CoreError;
use nexus_core::types::DbId;
use nexus_db::models::order::{
    CheckoutOutcome, KeyShortfall, Order, OrderDetail, OrderLine, OrderWithItems, PaidOrder,
    PayOutcome,
};
use nexus_db::repositories::OrderRepo;
use uuid::Uuid;

use crate::cart_store::SessionKey;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Provider name recorded on orders paid through the demo stub.
const DEMO_PROVIDER: &str = "demo";

fn shortfall_error(s: &KeyShortfall) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Not enough keys for {}: requested {}, available {}",
        s.product_name, s.requested, s.available
    )))
}

/// POST /api/v1/checkout/start
///
/// Snapshot the session cart into an order (status `new`) with one item
/// per line and reserve the keys. All-or-nothing: any line that cannot be
/// fully reserved aborts the checkout with 409 and the cart is untouched.
/// The cart is not cleared until the order is paid.
pub async fn start(
    auth: AuthUser,
    SessionKey(key): SessionKey,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<OrderWithItems>>)> {
    let cart = state.carts.snapshot(key).await;
    if cart.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Cart is empty".into(),
        )));
    }

    let lines: Vec<OrderLine> = cart
        .lines()
        .iter()
        .map(|l| OrderLine {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();

    match OrderRepo::create_with_items(&state.pool, auth.user_id, &lines).await? {
        CheckoutOutcome::Created(order) => {
            tracing::info!(
                order_id = order.order.id,
                user_id = auth.user_id,
                total_cents = order.order.total_cents,
                "Checkout started, keys reserved",
            );
            Ok((StatusCode::CREATED, Json(DataResponse { data: order })))
        }
        CheckoutOutcome::Shortfall(s) => Err(shortfall_error(&s)),
        CheckoutOutcome::MissingProduct(product_id) => Err(AppError::Core(CoreError::Conflict(
            format!("Product {product_id} is no longer available"),
        ))),
    }
}

/// POST /api/v1/checkout/{order_id}/pay
///
/// Demo payment stub: allocates the reserved keys, marks the order paid,
/// and clears the session cart. Returns the purchased key values per item.
pub async fn pay(
    auth: AuthUser,
    SessionKey(key): SessionKey,
    State(state): State<AppState>,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PaidOrder>>> {
    let payment_id = Uuid::new_v4().to_string();

    let outcome = OrderRepo::pay(&state.pool, order_id, auth.user_id, DEMO_PROVIDER, &payment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Order",
            id: order_id,
        }))?;

    match outcome {
        PayOutcome::Paid(paid) => {
            state.carts.clear(key).await;
            tracing::info!(
                order_id,
                user_id = auth.user_id,
                "Order paid, keys delivered",
            );
            Ok(Json(DataResponse { data: paid }))
        }
        PayOutcome::NotPayable(status) => Err(AppError::Core(CoreError::Conflict(format!(
            "Order is not payable in status '{}'",
            status.as_str()
        )))),
        PayOutcome::Shortfall(s) => Err(shortfall_error(&s)),
    }
}

/// POST /api/v1/checkout/{order_id}/cancel
///
/// Cancel an unpaid order and release its key reservations.
pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(order_id): Path<DbId>,
) -> AppResult<StatusCode> {
    match OrderRepo::cancel(&state.pool, order_id, auth.user_id).await? {
        None => Err(AppError::Core(CoreError::NotFound {
            entity: "Order",
            id: order_id,
        })),
        Some(false) => Err(AppError::Core(CoreError::Conflict(
            "Only unpaid orders can be canceled".into(),
        ))),
        Some(true) => {
            tracing::info!(order_id, user_id = auth.user_id, "Order canceled");
            Ok(StatusCode::NO_CONTENT)
        }
    }
}

/// GET /api/v1/orders
pub async fn list_orders(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Order>>>> {
    let orders = OrderRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: orders }))
}

/// GET /api/v1/orders/{id}
///
/// One of the caller's orders with its items; key values appear only once
/// the order is paid. Orders of other users are indistinguishable from
/// unknown ids (404).
pub async fn get_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderDetail>>> {
    let detail = OrderRepo::find_detail_for_user(&state.pool, order_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Order",
            id: order_id,
        }))?;

    Ok(Json(DataResponse { data: detail }))
}
