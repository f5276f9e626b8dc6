//! Order and order-item models, plus the checkout outcome types.

use nexus_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Order lifecycle status. Transitions: `new -> paid`, `new -> canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Paid,
    Canceled,
}

impl OrderStatus {
    /// The wire / database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Paid => "paid",
            Self::Canceled => "canceled",
        }
    }
}

/// Full order row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub user_id: DbId,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub provider: Option<String>,
    pub provider_payment_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order item row. `price_cents` is a snapshot taken at checkout-start and
/// is immune to later product price changes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub product_id: DbId,
    pub price_cents: i64,
    pub quantity: i64,
    pub created_at: Timestamp,
}

/// One requested line at checkout-start.
#[derive(Debug, Clone, Copy)]
pub struct OrderLine {
    pub product_id: DbId,
    pub quantity: i64,
}

/// An order together with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A product line that could not be fully reserved or allocated.
#[derive(Debug, Clone, Serialize)]
pub struct KeyShortfall {
    pub product_id: DbId,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

/// Result of checkout-start. Any failure aborts the whole transaction:
/// no order row and no reservations exist in that case.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Created(OrderWithItems),
    Shortfall(KeyShortfall),
    /// A cart line referenced a product that no longer exists or was
    /// withdrawn from sale.
    MissingProduct(DbId),
}

/// One fulfilled item in a paid order, including the delivered key values.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FulfilledItem {
    pub product_id: DbId,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub key_values: Vec<String>,
}

/// A paid order with its delivered keys.
#[derive(Debug, Clone, Serialize)]
pub struct PaidOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<FulfilledItem>,
}

/// Result of checkout-pay. Any failure leaves the order in `new` status
/// with its reservations intact.
#[derive(Debug)]
pub enum PayOutcome {
    Paid(PaidOrder),
    /// The order exists but is not in `new` status.
    NotPayable(OrderStatus),
    /// A reserved key disappeared mid-flight (e.g. deleted by an admin);
    /// the whole allocation was rolled back.
    Shortfall(KeyShortfall),
}

/// Order detail for the read API: items joined with product names, key
/// values present only once the order is paid.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<FulfilledItem>,
}
