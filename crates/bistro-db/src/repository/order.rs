//! # Order Repository
//!
//! Persistence for committed orders.
//!
//! ## Commit / Cancel
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One transaction each                              │
//! │                                                                         │
//! │  commit(order)                                                         │
//! │     ├── reserve_with(promotion, customer)   for every applied promo    │
//! │     ├── INSERT orders                                                  │
//! │     ├── INSERT promotion_redemptions        one per applied promo      │
//! │     └── COMMIT   (any failure above rolls everything back)             │
//! │                                                                         │
//! │  cancel(order_id)                                                      │
//! │     ├── UPDATE orders SET cancelled ... WHERE not yet cancelled        │
//! │     │      └── 0 rows → NotFound or Conflict                           │
//! │     ├── release_with(promotion, customer)   for every open redemption  │
//! │     ├── UPDATE promotion_redemptions SET released_at                   │
//! │     └── COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both transactions start with a write so SQLite takes the write lock
//! up front instead of upgrading a read lock mid-transaction.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{release_with, reserve_with};
use bistro_core::{CustomerDetails, OrderStatus, PlacedOrder};

const SELECT_ORDER: &str = r#"
    SELECT
        id, customer_name, customer_phone, guests, order_status,
        third_party_vendor, items, applied_promotions,
        subtotal, promotion_discount, total, tax, total_with_tax,
        created_at, cancelled_at
    FROM orders
    WHERE id = ?1
"#;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_name: String,
    customer_phone: Option<String>,
    guests: Option<i64>,
    order_status: OrderStatus,
    third_party_vendor: Option<String>,
    items: String,
    applied_promotions: String,
    subtotal: i64,
    promotion_discount: i64,
    total: i64,
    tax: i64,
    total_with_tax: i64,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for PlacedOrder {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        Ok(PlacedOrder {
            id: row.id,
            customer_details: CustomerDetails {
                name: row.customer_name,
                phone: row.customer_phone,
                guests: row.guests.map(|g| g.max(0) as u32),
            },
            order_status: row.order_status,
            bills: bistro_core::Bills {
                subtotal: row.subtotal,
                promotion_discount: row.promotion_discount,
                total: row.total,
                tax: row.tax,
                total_with_tax: row.total_with_tax,
            },
            applied_promotions: serde_json::from_str(&row.applied_promotions)?,
            items: serde_json::from_str(&row.items)?,
            third_party_vendor: row.third_party_vendor,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a validated order and reserves every promotion it uses.
    ///
    /// ## Arguments
    /// * `order` - Order carrying the server-computed bills
    /// * `customer_key` - Per-customer usage key, if the customer is known
    /// * `redeemed_on` - Store calendar date the redemptions count towards
    ///
    /// ## Errors
    /// - `UsageLimitReached` if a promotion ran out after pricing
    /// - `NotFound` if an applied promotion was deleted after pricing
    ///
    /// On error nothing is written.
    pub async fn commit(
        &self,
        order: &PlacedOrder,
        customer_key: Option<&str>,
        redeemed_on: NaiveDate,
    ) -> DbResult<()> {
        let items = serde_json::to_string(&order.items)?;
        let applied = serde_json::to_string(&order.applied_promotions)?;

        debug!(
            id = %order.id,
            promotions = order.applied_promotions.len(),
            total = order.bills.total_with_tax,
            "Committing order"
        );

        let mut tx = self.pool.begin().await?;

        for promotion in &order.applied_promotions {
            reserve_with(&mut tx, &promotion.promotion_id, customer_key).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_name, customer_phone, guests, order_status,
                third_party_vendor, items, applied_promotions,
                subtotal, promotion_discount, total, tax, total_with_tax,
                created_at, cancelled_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, NULL
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_details.name)
        .bind(&order.customer_details.phone)
        .bind(order.customer_details.guests.map(i64::from))
        .bind(order.order_status)
        .bind(&order.third_party_vendor)
        .bind(&items)
        .bind(&applied)
        .bind(order.bills.subtotal)
        .bind(order.bills.promotion_discount)
        .bind(order.bills.total)
        .bind(order.bills.tax)
        .bind(order.bills.total_with_tax)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("order id", order.id.clone()),
            other => other,
        })?;

        for promotion in &order.applied_promotions {
            sqlx::query(
                r#"
                INSERT INTO promotion_redemptions (
                    order_id, promotion_id, customer_key, discount_amount, redeemed_on
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&order.id)
            .bind(&promotion.promotion_id)
            .bind(customer_key)
            .bind(promotion.discount_amount)
            .bind(redeemed_on)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %order.id, total = order.bills.total_with_tax, "Order committed");
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PlacedOrder>> {
        let row: Option<OrderRow> = sqlx::query_as(SELECT_ORDER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PlacedOrder::try_from).transpose()
    }

    /// Cancels an order and gives back the promotion uses it held.
    ///
    /// ## Errors
    /// - `NotFound` if there is no such order
    /// - `Conflict` if it was already cancelled
    pub async fn cancel(&self, id: &str, now: DateTime<Utc>) -> DbResult<PlacedOrder> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = ?2, cancelled_at = ?3
            WHERE id = ?1 AND cancelled_at IS NULL
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Cancelled)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists = fetch_order(&mut tx, id).await?.is_some();
            return Err(if exists {
                DbError::Conflict(format!("Order {} is already cancelled", id))
            } else {
                DbError::not_found("Order", id)
            });
        }

        let open: Vec<(i64, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, promotion_id, customer_key
            FROM promotion_redemptions
            WHERE order_id = ?1 AND released_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for (redemption_id, promotion_id, customer_key) in &open {
            release_with(&mut tx, promotion_id, customer_key.as_deref()).await?;
            sqlx::query("UPDATE promotion_redemptions SET released_at = ?2 WHERE id = ?1")
                .bind(redemption_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        tx.commit().await?;

        info!(id = %id, released = open.len(), "Order cancelled");
        Ok(order)
    }
}

async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PlacedOrder>> {
    let row: Option<OrderRow> = sqlx::query_as(SELECT_ORDER)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(PlacedOrder::try_from).transpose()
}

// =============================================================================
// Unit Tests
// =============================================================================
