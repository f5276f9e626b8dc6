//! Shared query parameter types for API handlers.

use serde::Deserialize;

use nexus_db::models::product::{CatalogFilter, CatalogSort};

/// Query parameters for the catalog listing
/// (`?category=&min_price=&max_price=&sort=`).
///
/// Prices are inclusive bounds in cents. `sort` accepts `price_asc`,
/// `price_desc`, or `new`; anything else keeps the default ordering.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: Option<String>,
}

impl CatalogParams {
    /// Convert the raw query parameters into a repository filter.
    pub fn into_filter(self) -> CatalogFilter {
        CatalogFilter {
            category_slug: self.category.filter(|s| !s.is_empty()),
            min_price_cents: self.min_price,
            max_price_cents: self.max_price,
            sort: CatalogSort::parse(self.sort.as_deref()),
        }
    }
}
