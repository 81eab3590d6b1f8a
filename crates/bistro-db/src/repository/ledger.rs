//! # Usage Ledger
//!
//! The only code that changes promotion usage counters.
//!
//! ## Reserve / Release
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(promotion, customer)            inside the commit transaction  │
//! │                                                                         │
//! │  1. UPDATE promotions                                                   │
//! │        SET usage_count = usage_count + 1                                │
//! │      WHERE id = ? AND (usage_limit IS NULL                              │
//! │                        OR usage_count < usage_limit)                    │
//! │       │                                                                 │
//! │       ├── 0 rows → UsageLimitReached { scope: Promotion }               │
//! │       ▼                                                                 │
//! │  2. UPSERT promotion_customer_usage                                     │
//! │        usage_count + 1 WHERE limit IS NULL OR usage_count < limit       │
//! │       │                                                                 │
//! │       ├── 0 rows → UsageLimitReached { scope: Customer }                │
//! │       ▼                                                                 │
//! │  Ok: caller persists the order, then COMMIT                             │
//! │                                                                         │
//! │  release(promotion, customer): both counters - 1, floored at 0          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Check and increment are one statement, so two commits racing for the last
//! use cannot both succeed: SQLite serializes writers and the second UPDATE
//! sees the first one's increment. There is no read-then-write.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult, LimitScope};
use bistro_core::CustomerUsage;

/// Repository-style handle on the usage counters.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    pool: SqlitePool,
}

impl UsageLedger {
    /// Creates a new UsageLedger.
    pub fn new(pool: SqlitePool) -> Self {
        UsageLedger { pool }
    }

    /// Reserves one use in its own transaction.
    ///
    /// Order commits call [`reserve_with`] on their own transaction instead,
    /// so the reservation and the order row succeed or fail together.
    pub async fn reserve(&self, promotion_id: &str, customer_key: Option<&str>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        reserve_with(&mut tx, promotion_id, customer_key).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Gives one use back in its own transaction.
    pub async fn release(&self, promotion_id: &str, customer_key: Option<&str>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        release_with(&mut tx, promotion_id, customer_key).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Per-promotion usage of one customer.
    pub async fn customer_usage(&self, customer_key: &str) -> DbResult<CustomerUsage> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT promotion_id, usage_count
            FROM promotion_customer_usage
            WHERE customer_key = ?1
            "#,
        )
        .bind(customer_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u32))
            .collect())
    }

    /// Current global usage count of a promotion.
    pub async fn usage_count(&self, promotion_id: &str) -> DbResult<u32> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT usage_count FROM promotions WHERE id = ?1")
                .bind(promotion_id)
                .fetch_optional(&self.pool)
                .await?;

        count
            .map(|c| c.max(0) as u32)
            .ok_or_else(|| DbError::not_found("Promotion", promotion_id))
    }
}

/// Reserves one use of `promotion_id` on an open connection or transaction.
///
/// ## Errors
/// - `NotFound` if the promotion does not exist
/// - `UsageLimitReached` if either counter is at its limit
pub async fn reserve_with(
    conn: &mut SqliteConnection,
    promotion_id: &str,
    customer_key: Option<&str>,
) -> DbResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE promotions
        SET usage_count = usage_count + 1
        WHERE id = ?1
          AND (usage_limit IS NULL OR usage_count < usage_limit)
        "#,
    )
    .bind(promotion_id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM promotions WHERE id = ?1")
            .bind(promotion_id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Promotion", promotion_id));
        }
        warn!(promotion_id = %promotion_id, "Usage limit reached at commit");
        return Err(DbError::limit_reached(promotion_id, LimitScope::Promotion));
    }

    if let Some(customer_key) = customer_key {
        let per_customer_limit: Option<i64> =
            sqlx::query_scalar("SELECT per_customer_limit FROM promotions WHERE id = ?1")
                .bind(promotion_id)
                .fetch_one(&mut *conn)
                .await?;

        let upserted = sqlx::query(
            r#"
            INSERT INTO promotion_customer_usage (promotion_id, customer_key, usage_count)
            VALUES (?1, ?2, 1)
            ON CONFLICT (promotion_id, customer_key) DO UPDATE
            SET usage_count = usage_count + 1
            WHERE ?3 IS NULL OR promotion_customer_usage.usage_count < ?3
            "#,
        )
        .bind(promotion_id)
        .bind(customer_key)
        .bind(per_customer_limit)
        .execute(&mut *conn)
        .await?;

        if upserted.rows_affected() == 0 {
            warn!(
                promotion_id = %promotion_id,
                customer_key = %customer_key,
                "Per-customer limit reached at commit"
            );
            return Err(DbError::limit_reached(promotion_id, LimitScope::Customer));
        }
    }

    debug!(promotion_id = %promotion_id, "Usage reserved");
    Ok(())
}

/// Gives back one use of `promotion_id`. Counters never go below zero, and
/// a promotion deleted since the reservation is ignored.
pub async fn release_with(
    conn: &mut SqliteConnection,
    promotion_id: &str,
    customer_key: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE promotions
        SET usage_count = MAX(usage_count - 1, 0)
        WHERE id = ?1
        "#,
    )
    .bind(promotion_id)
    .execute(&mut *conn)
    .await?;

    if let Some(customer_key) = customer_key {
        sqlx::query(
            r#"
            UPDATE promotion_customer_usage
            SET usage_count = MAX(usage_count - 1, 0)
            WHERE promotion_id = ?1 AND customer_key = ?2
            "#,
        )
        .bind(promotion_id)
        .bind(customer_key)
        .execute(&mut *conn)
        .await?;
    }

    debug!(promotion_id = %promotion_id, "Usage released");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
