//! # Promotion Repository
//!
//! The promotion catalog: admin CRUD, coupon lookup and usage analytics.
//!
//! ## Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  promotions row                                                         │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  id, name, promotion_type, code, priority, is_active   ← for SQL lookups│
//! │  usage_limit, per_customer_limit                       ← for the ledger │
//! │  usage_count                                           ← ledger-owned   │
//! │  definition (JSON PromotionPayload)                    ← full config    │
//! │                                                                         │
//! │  Reading a row re-validates `definition` into a core Promotion, then    │
//! │  overlays `usage_count` from its column.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `usage_count` is never written here. Admin updates leave it alone; only
//! the usage ledger moves it.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use bistro_core::{CoreError, Promotion, PromotionAnalytics, PromotionPayload};

/// Catalog order: insertion order, which is the tie-break for equal
/// priorities.
const SELECT_PROMOTION: &str = r#"
    SELECT id, usage_count, definition
    FROM promotions
"#;

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    usage_count: i64,
    definition: String,
}

impl PromotionRow {
    fn into_promotion(self) -> DbResult<Promotion> {
        decode_definition(self.id, self.usage_count, &self.definition)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnalyticsRow {
    id: String,
    usage_count: i64,
    definition: String,
    redemptions: i64,
    total_discount: i64,
}

fn decode_definition(id: String, usage_count: i64, definition: &str) -> DbResult<Promotion> {
    let payload: PromotionPayload = serde_json::from_str(definition)?;
    let mut promotion =
        payload
            .into_promotion(id.clone())
            .map_err(|e| CoreError::InvalidPromotion {
                id,
                reason: e.to_string(),
            })?;
    promotion.usage_count = usage_count.max(0) as u32;
    Ok(promotion)
}

fn encode_definition(promotion: &Promotion) -> DbResult<String> {
    let mut payload = PromotionPayload::from(promotion);
    // id and counters live in their own columns
    payload.id = None;
    payload.usage_count = 0;
    payload.remaining_usage = None;
    Ok(serde_json::to_string(&payload)?)
}

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Every promotion, active or not, in catalog order.
    pub async fn list_all(&self) -> DbResult<Vec<Promotion>> {
        let rows: Vec<PromotionRow> =
            sqlx::query_as(&format!("{} ORDER BY rowid", SELECT_PROMOTION))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = rows.len(), "Loaded promotion catalog");
        rows.into_iter().map(PromotionRow::into_promotion).collect()
    }

    /// Gets a promotion by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let row: Option<PromotionRow> =
            sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_PROMOTION))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(PromotionRow::into_promotion).transpose()
    }

    /// Finds the promotion carrying `code`, trimmed and case-insensitive.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Promotion>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let row: Option<PromotionRow> = sqlx::query_as(&format!(
            "{} WHERE code IS NOT NULL AND lower(code) = lower(?1)",
            SELECT_PROMOTION
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PromotionRow::into_promotion).transpose()
    }

    /// Inserts a new promotion. Its usage count starts at zero.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `code` if another promotion already uses the
    ///   code in any letter case
    pub async fn create(&self, promotion: &Promotion) -> DbResult<Promotion> {
        let definition = encode_definition(promotion)?;
        let now = Utc::now();

        debug!(id = %promotion.id, name = %promotion.name, "Creating promotion");

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, name, promotion_type, code, priority, is_active,
                usage_limit, per_customer_limit, usage_count,
                definition, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, 0,
                ?9, ?10, ?10
            )
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion.promotion_type)
        .bind(&promotion.code)
        .bind(promotion.priority)
        .bind(promotion.is_active)
        .bind(promotion.conditions.usage_limit.map(i64::from))
        .bind(promotion.conditions.per_customer_limit.map(i64::from))
        .bind(&definition)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, promotion))?;

        info!(id = %promotion.id, promotion_type = %promotion.promotion_type, "Promotion created");

        let mut created = promotion.clone();
        created.usage_count = 0;
        Ok(created)
    }

    /// Replaces a promotion's configuration. The usage count is kept.
    pub async fn update(&self, promotion: &Promotion) -> DbResult<Promotion> {
        let definition = encode_definition(promotion)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE promotions SET
                name = ?2,
                promotion_type = ?3,
                code = ?4,
                priority = ?5,
                is_active = ?6,
                usage_limit = ?7,
                per_customer_limit = ?8,
                definition = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion.promotion_type)
        .bind(&promotion.code)
        .bind(promotion.priority)
        .bind(promotion.is_active)
        .bind(promotion.conditions.usage_limit.map(i64::from))
        .bind(promotion.conditions.per_customer_limit.map(i64::from))
        .bind(&definition)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, promotion))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", &promotion.id));
        }

        info!(id = %promotion.id, "Promotion updated");

        self.get_by_id(&promotion.id)
            .await?
            .ok_or_else(|| DbError::not_found("Promotion", &promotion.id))
    }

    /// Deletes a promotion. Committed orders keep their redemption history.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        info!(id = %id, "Promotion deleted");
        Ok(())
    }

    /// Usage and discount totals per promotion, for orders redeemed between
    /// `start` and `end` (inclusive, store calendar dates). Cancelled orders
    /// are not counted.
    pub async fn analytics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<PromotionAnalytics>> {
        let rows: Vec<AnalyticsRow> = sqlx::query_as(
            r#"
            SELECT
                p.id,
                p.usage_count,
                p.definition,
                COUNT(r.id) AS redemptions,
                COALESCE(SUM(r.discount_amount), 0) AS total_discount
            FROM promotions p
            LEFT JOIN promotion_redemptions r
                ON r.promotion_id = p.id
               AND r.released_at IS NULL
               AND r.redeemed_on BETWEEN ?1 AND ?2
            GROUP BY p.id
            ORDER BY p.rowid
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let promotion = decode_definition(row.id, row.usage_count, &row.definition)?;
                Ok(PromotionAnalytics {
                    usage_limit: promotion.conditions.usage_limit,
                    remaining_usage: promotion.remaining_usage(),
                    promotion_id: promotion.id,
                    name: promotion.name,
                    promotion_type: promotion.promotion_type,
                    code: promotion.code,
                    is_active: promotion.is_active,
                    usage_count: promotion.usage_count,
                    redemptions: row.redemptions.max(0) as u32,
                    total_discount: row.total_discount,
                })
            })
            .collect()
    }
}

fn duplicate_code(err: sqlx::Error, promotion: &Promotion) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("idx_promotions_code") => {
            DbError::duplicate("code", promotion.code.clone().unwrap_or_default())
        }
        DbError::UniqueViolation { .. } => DbError::duplicate("id", promotion.id.clone()),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use bistro_core::{Conditions, DiscountKind, PromotionType, Scope};

    pub(crate) fn sample_promotion(id: &str, code: Option<&str>) -> Promotion {
        Promotion {
            id: id.to_string(),
            name: format!("Promo {}", id),
            description: None,
            promotion_type: PromotionType::OrderPercentage,
            discount: DiscountKind::Percentage(10),
            scope: Scope::AllOrder,
            conditions: Conditions::default(),
            is_active: true,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            priority: 0,
            code: code.map(str::to_string),
            usage_count: 0,
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        let mut promo = sample_promotion("p1", Some("Lunch10"));
        promo.conditions.usage_limit = Some(50);
        repo.create(&promo).await.unwrap();

        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded, promo);
        assert_eq!(loaded.remaining_usage(), Some(50));
        assert!(repo.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_insensitive_and_unique() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();
        repo.create(&sample_promotion("p1", Some("LUNCH10")))
            .await
            .unwrap();

        let found = repo.find_by_code("  lunch10 ").await.unwrap().unwrap();
        assert_eq!(found.id, "p1");
        assert!(repo.find_by_code("DINNER").await.unwrap().is_none());
        assert!(repo.find_by_code("   ").await.unwrap().is_none());

        let err = repo
            .create(&sample_promotion("p2", Some("Lunch10")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));
    }

    #[tokio::test]
    async fn test_catalog_order_and_update_keeps_usage() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();
        for id in ["b", "a", "c"] {
            repo.create(&sample_promotion(id, None)).await.unwrap();
        }
        let ids: Vec<String> = repo.list_all().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        db.ledger().reserve("a", None).await.unwrap();

        let mut edited = sample_promotion("a", None);
        edited.name = "Renamed".to_string();
        edited.discount = DiscountKind::Percentage(15);
        let updated = repo.update(&edited).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.discount, DiscountKind::Percentage(15));
        assert_eq!(updated.usage_count, 1);

        let missing = repo.update(&sample_promotion("zzz", None)).await.unwrap_err();
        assert!(matches!(missing, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();
        repo.create(&sample_promotion("p1", None)).await.unwrap();

        repo.delete("p1").await.unwrap();
        assert!(repo.get_by_id("p1").await.unwrap().is_none());
        assert!(matches!(
            repo.delete("p1").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_analytics_without_redemptions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut promo = sample_promotion("p1", None);
        promo.conditions.usage_limit = Some(3);
        db.promotions().create(&promo).await.unwrap();
        db.ledger().reserve("p1", None).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let report = db.promotions().analytics(start, end).await.unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].usage_count, 1);
        assert_eq!(report[0].remaining_usage, Some(2));
        assert_eq!(report[0].redemptions, 0);
        assert_eq!(report[0].total_discount, 0);
    }
}
