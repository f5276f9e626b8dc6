//! Product key (license key / account credential) model and DTOs.

use nexus_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One sellable key for a product.
///
/// `is_sold` is the authoritative state; `is_active` is a legacy mirror
/// kept equal to `NOT is_sold` on every write. A key is *free* when it is
/// neither sold nor reserved by a pending order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductKey {
    pub id: DbId,
    pub product_id: DbId,
    pub key_value: String,
    pub is_active: bool,
    pub is_sold: bool,
    pub reserved_order_id: Option<DbId>,
    pub order_item_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for creating a single key.
#[derive(Debug, Deserialize)]
pub struct CreateProductKey {
    pub key_value: String,
}

/// DTO for bulk key import: one key value per line.
#[derive(Debug, Deserialize)]
pub struct ImportProductKeys {
    pub key_values: Vec<String>,
}

/// DTO for the legacy sold-state toggle. `is_active` follows implicitly.
#[derive(Debug, Deserialize)]
pub struct UpdateProductKey {
    pub is_sold: Option<bool>,
}
