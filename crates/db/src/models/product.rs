//! Product entity model, DTOs, and catalog filter types.

use nexus_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full product row from the `products` table.
///
/// `stock` and `sold_count` are derived values, recomputed from the key
/// inventory on every key mutation; they are never accepted as input.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub code: String,
    pub category_id: DbId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_path: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub sold_count: i64,
    pub is_available: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a product. When `slug` is absent it is derived from
/// the name.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub code: String,
    pub category_id: DbId,
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_available: Option<bool>,
}

/// DTO for updating a product. Only non-`None` fields are applied;
/// `stock` / `sold_count` are deliberately absent.
#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub category_id: Option<DbId>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub is_available: Option<bool>,
}

/// Catalog sort orders. Unrecognized values fall back to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogSort {
    PriceAsc,
    PriceDesc,
    Newest,
    /// Newest-first, same as the storefront landing order.
    #[default]
    Default,
}

impl CatalogSort {
    /// Parse the `?sort=` query value; anything unknown keeps the default
    /// ordering.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("new") => Self::Newest,
            _ => Self::Default,
        }
    }
}

/// Filter for the catalog listing. Price bounds are inclusive, in cents.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub category_slug: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub sort: CatalogSort,
}
