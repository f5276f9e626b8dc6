//! Repository for the `product_keys` table.
//!
//! Every mutation that can change a key's sold state finishes by
//! recomputing the owning product's derived counters in the same
//! transaction, so `products.stock` / `products.sold_count` never drift
//! from the key inventory.

use nexus_core::types::DbId;
use sqlx::PgPool;

use crate::models::product_key::ProductKey;
use crate::repositories::ProductRepo;

const COLUMNS: &str = "id, product_id, key_value, is_active, is_sold, \
                        reserved_order_id, order_item_id, created_at";

/// Provides CRUD operations for product keys.
pub struct ProductKeyRepo;

impl ProductKeyRepo {
    /// Insert a single key for a product.
    pub async fn create(
        pool: &PgPool,
        product_id: DbId,
        key_value: &str,
    ) -> Result<ProductKey, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO product_keys (product_id, key_value)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let key = sqlx::query_as::<_, ProductKey>(&query)
            .bind(product_id)
            .bind(key_value)
            .fetch_one(&mut *tx)
            .await?;

        ProductRepo::recompute_counters(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(key)
    }

    /// Bulk-import keys for a product. Returns the created rows.
    ///
    /// All-or-nothing: a duplicate key value anywhere in the batch fails
    /// the whole import via `uq_product_keys_key_value`.
    pub async fn import(
        pool: &PgPool,
        product_id: DbId,
        key_values: &[String],
    ) -> Result<Vec<ProductKey>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO product_keys (product_id, key_value)
             SELECT $1, value FROM UNNEST($2::text[]) AS t(value)
             RETURNING {COLUMNS}"
        );
        let keys = sqlx::query_as::<_, ProductKey>(&query)
            .bind(product_id)
            .bind(key_values)
            .fetch_all(&mut *tx)
            .await?;

        ProductRepo::recompute_counters(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(keys)
    }

    /// List all keys for a product, newest first.
    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<ProductKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM product_keys
             WHERE product_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProductKey>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Find a key by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProductKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM product_keys WHERE id = $1");
        sqlx::query_as::<_, ProductKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set a key's sold state directly (legacy admin toggle).
    ///
    /// `is_active` is updated in lockstep to stay the mirror of
    /// `NOT is_sold`. Returns `None` if the key does not exist.
    pub async fn set_sold_state(
        pool: &PgPool,
        id: DbId,
        is_sold: bool,
    ) -> Result<Option<ProductKey>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE product_keys SET
                is_sold = $2,
                is_active = NOT $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let key = sqlx::query_as::<_, ProductKey>(&query)
            .bind(id)
            .bind(is_sold)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(ref key) = key {
            ProductRepo::recompute_counters(&mut tx, key.product_id).await?;
        }
        tx.commit().await?;
        Ok(key)
    }

    /// Delete an unsold key. Sold keys are never deleted by normal flow.
    ///
    /// Returns `true` if the row was deleted; `false` when the key does
    /// not exist or is already sold.
    pub async fn delete_unsold(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted: Option<(DbId,)> = sqlx::query_as(
            "DELETE FROM product_keys
             WHERE id = $1 AND is_sold = false
             RETURNING product_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id,)) = deleted else {
            tx.rollback().await?;
            return Ok(false);
        };

        ProductRepo::recompute_counters(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}
