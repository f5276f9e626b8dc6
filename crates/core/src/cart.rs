//! The session cart: an explicit product-id → quantity map.
//!
//! The cart is a plain value type passed through handler boundaries; it
//! knows nothing about inventory. Availability checks (may this unit be
//! added?) and pricing happen at the call sites against current product
//! data, so the cart itself never goes stale.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::DbId;

/// One (product, quantity) pair as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: DbId,
    pub quantity: i64,
}

/// Per-session quantity map. Ordered by product id for deterministic
/// iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<DbId, i64>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current quantity for a product (0 when absent).
    pub fn quantity(&self, product_id: DbId) -> i64 {
        self.lines.get(&product_id).copied().unwrap_or(0)
    }

    /// Increment a product's quantity by exactly one.
    ///
    /// Returns the new quantity. The caller is responsible for checking
    /// availability *before* calling this.
    pub fn add_one(&mut self, product_id: DbId) -> i64 {
        let qty = self.lines.entry(product_id).or_insert(0);
        *qty += 1;
        *qty
    }

    /// Remove a product's line entirely. Returns `true` if a line existed.
    pub fn remove(&mut self, product_id: DbId) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    /// All lines, ordered by product id.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines
            .iter()
            .map(|(&product_id, &quantity)| CartLine {
                product_id,
                quantity,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
