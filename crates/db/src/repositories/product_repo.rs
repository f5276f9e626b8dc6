//! Repository for the `products` table, including the derived-counter
//! recompute used by every key mutation.

use nexus_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::product::{CatalogFilter, CatalogSort, CreateProduct, Product, UpdateProduct};

const COLUMNS: &str = "id, code, category_id, name, slug, description, image_path, \
                        price_cents, stock, sold_count, is_available, created_at, updated_at";

/// `COLUMNS` qualified with the `p.` alias for joined queries.
const P_COLUMNS: &str = "p.id, p.code, p.category_id, p.name, p.slug, p.description, \
                          p.image_path, p.price_cents, p.stock, p.sold_count, p.is_available, \
                          p.created_at, p.updated_at";

/// Provides CRUD operations and counter recomputation for products.
pub struct ProductRepo;

impl ProductRepo {
    /// Insert a new product. The caller supplies the final slug (derived
    /// from the name when the DTO omits it).
    pub async fn create(
        pool: &PgPool,
        input: &CreateProduct,
        slug: &str,
    ) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products (code, category_id, name, slug, description, price_cents, is_available)
             VALUES ($1, $2, $3, $4, COALESCE($5, ''), $6, COALESCE($7, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.code)
            .bind(input.category_id)
            .bind(&input.name)
            .bind(slug)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.is_available)
            .fetch_one(pool)
            .await
    }

    /// Find a product by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a product by slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE slug = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Storefront landing selection: newest available products.
    pub async fn list_featured(pool: &PgPool, limit: i64) -> Result<Vec<Product>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM products
             WHERE is_available = true
             ORDER BY created_at DESC
             LIMIT $1"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Catalog listing: available products filtered by category slug and
    /// inclusive price bounds, with the requested sort order.
    pub async fn list_catalog(
        pool: &PgPool,
        filter: &CatalogFilter,
    ) -> Result<Vec<Product>, sqlx::Error> {
        let order_clause = match filter.sort {
            CatalogSort::PriceAsc => "p.price_cents ASC, p.id ASC",
            CatalogSort::PriceDesc => "p.price_cents DESC, p.id ASC",
            CatalogSort::Newest | CatalogSort::Default => "p.created_at DESC",
        };
        let query = format!(
            "SELECT {P_COLUMNS} FROM products p
             JOIN categories c ON c.id = p.category_id
             WHERE p.is_available = true
               AND ($1::text IS NULL OR c.slug = $1)
               AND ($2::bigint IS NULL OR p.price_cents >= $2)
               AND ($3::bigint IS NULL OR p.price_cents <= $3)
             ORDER BY {order_clause}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&filter.category_slug)
            .bind(filter.min_price_cents)
            .bind(filter.max_price_cents)
            .fetch_all(pool)
            .await
    }

    /// Update a product. Only non-`None` fields in `input` are applied;
    /// the derived counters cannot be touched through this path.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, sqlx::Error> {
        let query = format!(
            "UPDATE products SET
                code = COALESCE($2, code),
                category_id = COALESCE($3, category_id),
                name = COALESCE($4, name),
                slug = COALESCE($5, slug),
                description = COALESCE($6, description),
                price_cents = COALESCE($7, price_cents),
                is_available = COALESCE($8, is_available),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(input.category_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.is_available)
            .fetch_optional(pool)
            .await
    }

    /// Store the path of a freshly uploaded product image.
    pub async fn update_image(
        pool: &PgPool,
        id: DbId,
        image_path: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE products SET image_path = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(image_path)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a product. Cascades to its keys. Returns `true` if deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count keys that are free for sale: unsold and not reserved by a
    /// pending order. This is the number the cart checks against.
    pub async fn free_key_count(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM product_keys
             WHERE product_id = $1 AND is_sold = false AND reserved_order_id IS NULL",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Recompute the derived `stock` / `sold_count` counters from the key
    /// inventory.
    ///
    /// Called by every repository entry point that mutates key rows, inside
    /// the same transaction as the mutation. One full recount per call; the
    /// stated scale accepts the O(n) cost.
    pub async fn recompute_counters(
        conn: &mut PgConnection,
        product_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE products SET
                stock = (SELECT COUNT(*) FROM product_keys
                         WHERE product_id = $1 AND is_sold = false),
                sold_count = (SELECT COUNT(*) FROM product_keys
                              WHERE product_id = $1 AND is_sold = true),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(product_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
