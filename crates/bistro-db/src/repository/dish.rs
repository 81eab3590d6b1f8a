//! # Dish Repository
//!
//! Read access to the menu catalog. Orders are resolved against it so that
//! line categories come from the menu, not from the client.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bistro_core::Dish;

/// Repository for dish database operations.
#[derive(Debug, Clone)]
pub struct DishRepository {
    pool: SqlitePool,
}

impl DishRepository {
    /// Creates a new DishRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DishRepository { pool }
    }

    /// Gets a dish by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Dish>> {
        let dish = sqlx::query_as::<_, Dish>(
            r#"
            SELECT id, name, category, price, is_active
            FROM dishes
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(dish)
    }

    /// Loads every dish in `ids`, keyed by id. Unknown ids are simply absent.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<HashMap<String, Dish>> {
        let mut dishes = HashMap::with_capacity(ids.len());
        for id in ids {
            if dishes.contains_key(id) {
                continue;
            }
            if let Some(dish) = self.get_by_id(id).await? {
                dishes.insert(dish.id.clone(), dish);
            }
        }

        debug!(requested = ids.len(), found = dishes.len(), "Loaded dishes");
        Ok(dishes)
    }

    /// Lists the whole menu, active dishes first.
    pub async fn list_all(&self) -> DbResult<Vec<Dish>> {
        let dishes = sqlx::query_as::<_, Dish>(
            r#"
            SELECT id, name, category, price, is_active
            FROM dishes
            ORDER BY is_active DESC, category, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(dishes)
    }

    /// Inserts a dish.
    pub async fn insert(&self, dish: &Dish) -> DbResult<()> {
        debug!(id = %dish.id, name = %dish.name, "Inserting dish");

        sqlx::query(
            r#"
            INSERT INTO dishes (id, name, category, price, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&dish.id)
        .bind(&dish.name)
        .bind(&dish.category)
        .bind(dish.price)
        .bind(dish.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("dish id", dish.id.clone()),
            other => other,
        })?;

        Ok(())
    }

    /// Counts dishes (used by the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dishes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn dish(id: &str, active: bool) -> Dish {
        Dish {
            id: id.to_string(),
            name: format!("Dish {}", id),
            category: "c-noodle".to_string(),
            price: 38_000,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.dishes();

        repo.insert(&dish("pho", true)).await.unwrap();
        repo.insert(&dish("bun", false)).await.unwrap();

        let pho = repo.get_by_id("pho").await.unwrap().unwrap();
        assert_eq!(pho.price, 38_000);
        assert!(pho.is_active);
        assert!(repo.get_by_id("nope").await.unwrap().is_none());

        let found = repo
            .get_many(&["pho".to_string(), "bun".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(!found["bun"].is_active);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.list_all().await.unwrap()[0].id, "pho");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.dishes().insert(&dish("pho", true)).await.unwrap();

        let err = db.dishes().insert(&dish("pho", true)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
