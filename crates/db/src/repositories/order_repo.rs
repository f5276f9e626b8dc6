//! Repository for orders and order items: the two-phase checkout.
//!
//! Checkout-start reserves keys row-by-row with `FOR UPDATE SKIP LOCKED`
//! inside the same transaction that creates the order, so two concurrent
//! checkouts can never hold the same key. Checkout-pay converts the
//! reservation into an allocation and is equally all-or-nothing.

use nexus_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::order::{
    CheckoutOutcome, FulfilledItem, KeyShortfall, Order, OrderDetail, OrderItem, OrderLine,
    OrderStatus, OrderWithItems, PaidOrder, PayOutcome,
};
use crate::repositories::ProductRepo;

const COLUMNS: &str =
    "id, user_id, total_cents, status, provider, provider_payment_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, price_cents, quantity, created_at";

/// Provides the checkout transaction and order reads.
pub struct OrderRepo;

impl OrderRepo {
    /// Checkout-start: create an order (status `new`) with one item per
    /// line, snapshotting current prices, and reserve `quantity` free keys
    /// per line.
    ///
    /// All-or-nothing: the first line that cannot reserve its full
    /// quantity rolls the transaction back and reports the shortfall. The
    /// caller's cart is untouched either way.
    pub async fn create_with_items(
        pool: &PgPool,
        user_id: DbId,
        lines: &[OrderLine],
    ) -> Result<CheckoutOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Snapshot name + price per line; a vanished or withdrawn product
        // aborts the checkout.
        let mut snapshots: Vec<(OrderLine, String, i64)> = Vec::with_capacity(lines.len());
        let mut total_cents: i64 = 0;
        for line in lines {
            let row: Option<(String, i64)> = sqlx::query_as(
                "SELECT name, price_cents FROM products WHERE id = $1 AND is_available = true",
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((name, price_cents)) = row else {
                tx.rollback().await?;
                return Ok(CheckoutOutcome::MissingProduct(line.product_id));
            };
            total_cents += price_cents * line.quantity;
            snapshots.push((*line, name, price_cents));
        }

        let order_query = format!(
            "INSERT INTO orders (user_id, total_cents)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&order_query)
            .bind(user_id)
            .bind(total_cents)
            .fetch_one(&mut *tx)
            .await?;

        let item_query = format!(
            "INSERT INTO order_items (order_id, product_id, price_cents, quantity)
             VALUES ($1, $2, $3, $4)
             RETURNING {ITEM_COLUMNS}"
        );

        let mut items = Vec::with_capacity(snapshots.len());
        for (line, product_name, price_cents) in snapshots {
            let item = sqlx::query_as::<_, OrderItem>(&item_query)
                .bind(order.id)
                .bind(line.product_id)
                .bind(price_cents)
                .bind(line.quantity)
                .fetch_one(&mut *tx)
                .await?;

            // Reserve free keys for this line. SKIP LOCKED keeps two
            // concurrent checkouts from blocking on (or double-taking)
            // the same rows.
            let reserved = sqlx::query(
                "WITH free AS (
                     SELECT id FROM product_keys
                     WHERE product_id = $2
                       AND is_sold = false
                       AND reserved_order_id IS NULL
                     ORDER BY id
                     LIMIT $3
                     FOR UPDATE SKIP LOCKED
                 )
                 UPDATE product_keys k
                 SET reserved_order_id = $1
                 FROM free
                 WHERE k.id = free.id",
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            let reserved = reserved.rows_affected() as i64;
            if reserved < line.quantity {
                // Pre-attempt availability = what we got plus whatever is
                // still free (our own holds vanish with the rollback).
                let (remaining,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM product_keys
                     WHERE product_id = $1
                       AND is_sold = false
                       AND reserved_order_id IS NULL",
                )
                .bind(line.product_id)
                .fetch_one(&mut *tx)
                .await?;

                tx.rollback().await?;
                return Ok(CheckoutOutcome::Shortfall(KeyShortfall {
                    product_id: line.product_id,
                    product_name,
                    requested: line.quantity,
                    available: reserved + remaining,
                }));
            }

            items.push(item);
        }

        tx.commit().await?;
        Ok(CheckoutOutcome::Created(OrderWithItems { order, items }))
    }

    /// Checkout-pay (demo stub): allocate the reserved keys, mark the
    /// order paid, and record the provider fields.
    ///
    /// Returns `None` when the user has no order with this id. Allocation
    /// is atomic: a shortfall (a reserved key deleted mid-flight) rolls
    /// everything back and the order stays `new`.
    pub async fn pay(
        pool: &PgPool,
        order_id: DbId,
        user_id: DbId,
        provider: &str,
        provider_payment_id: &str,
    ) -> Result<Option<PayOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let order_query =
            format!("SELECT {COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE");
        let order = sqlx::query_as::<_, Order>(&order_query)
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(order) = order else {
            tx.rollback().await?;
            return Ok(None);
        };
        if order.status != OrderStatus::New {
            tx.rollback().await?;
            return Ok(Some(PayOutcome::NotPayable(order.status)));
        }

        let items: Vec<(DbId, DbId, String, i64, i64)> = sqlx::query_as(
            "SELECT oi.id, oi.product_id, p.name, oi.price_cents, oi.quantity
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = $1
             ORDER BY oi.id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut fulfilled = Vec::with_capacity(items.len());
        for (item_id, product_id, product_name, price_cents, quantity) in items {
            let key_values: Vec<String> = sqlx::query_scalar(
                "WITH picked AS (
                     SELECT id FROM product_keys
                     WHERE reserved_order_id = $1
                       AND product_id = $2
                       AND is_sold = false
                     ORDER BY id
                     LIMIT $3
                     FOR UPDATE
                 )
                 UPDATE product_keys k
                 SET is_sold = true,
                     is_active = false,
                     order_item_id = $4,
                     reserved_order_id = NULL
                 FROM picked
                 WHERE k.id = picked.id
                 RETURNING k.key_value",
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(item_id)
            .fetch_all(&mut *tx)
            .await?;

            let allocated = key_values.len() as i64;
            if allocated < quantity {
                tx.rollback().await?;
                return Ok(Some(PayOutcome::Shortfall(KeyShortfall {
                    product_id,
                    product_name,
                    requested: quantity,
                    available: allocated,
                })));
            }

            ProductRepo::recompute_counters(&mut tx, product_id).await?;

            fulfilled.push(FulfilledItem {
                product_id,
                product_name,
                price_cents,
                quantity,
                key_values,
            });
        }

        let paid_query = format!(
            "UPDATE orders SET
                status = 'paid',
                provider = $2,
                provider_payment_id = $3,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&paid_query)
            .bind(order_id)
            .bind(provider)
            .bind(provider_payment_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(PayOutcome::Paid(PaidOrder {
            order,
            items: fulfilled,
        })))
    }

    /// Cancel a `new` order and release its key reservations.
    ///
    /// Returns `None` when the order is not the caller's, `Some(false)`
    /// when it is no longer cancelable, `Some(true)` on success.
    pub async fn cancel(
        pool: &PgPool,
        order_id: DbId,
        user_id: DbId,
    ) -> Result<Option<bool>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let status: Option<OrderStatus> = sqlx::query_scalar(
            "SELECT status FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = status else {
            tx.rollback().await?;
            return Ok(None);
        };
        if status != OrderStatus::New {
            tx.rollback().await?;
            return Ok(Some(false));
        }

        sqlx::query("UPDATE product_keys SET reserved_order_id = NULL WHERE reserved_order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET status = 'canceled', updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(true))
    }

    /// Cancel every unpaid order created before `cutoff` and release its
    /// reservations. Invoked by the background sweeper so abandoned
    /// checkouts cannot hold keys forever. Returns the number of orders
    /// canceled.
    pub async fn release_stale(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE product_keys SET reserved_order_id = NULL
             WHERE reserved_order_id IN
                 (SELECT id FROM orders WHERE status = 'new' AND created_at < $1)",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE orders SET status = 'canceled', updated_at = NOW()
             WHERE status = 'new' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// List a user's orders, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Load one of the user's orders with its items. Key values are only
    /// present on items of paid orders (unpaid items have no allocations).
    pub async fn find_detail_for_user(
        pool: &PgPool,
        order_id: DbId,
        user_id: DbId,
    ) -> Result<Option<OrderDetail>, sqlx::Error> {
        let order_query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1 AND user_id = $2");
        let order = sqlx::query_as::<_, Order>(&order_query)
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, FulfilledItem>(
            "SELECT oi.product_id,
                    p.name AS product_name,
                    oi.price_cents,
                    oi.quantity,
                    COALESCE(array_agg(k.key_value ORDER BY k.id)
                             FILTER (WHERE k.id IS NOT NULL), '{}') AS key_values
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             LEFT JOIN product_keys k ON k.order_item_id = oi.id
             WHERE oi.order_id = $1
             GROUP BY oi.id, p.name
             ORDER BY oi.id",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await?;

        Ok(Some(OrderDetail { order, items }))
    }
}
