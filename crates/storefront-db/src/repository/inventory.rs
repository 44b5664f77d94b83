//! # Inventory Repository
//!
//! Per-(seller, product) stock entries.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: Absolute update from a stale read                        │
//! │     UPDATE stock_entries SET quantity = 4 WHERE id = ?              │
//! │                                                                     │
//! │  ✅ CORRECT: Delta update guarded by the check                      │
//! │     UPDATE stock_entries SET quantity = quantity - 1                │
//! │     WHERE seller_id = ? AND product_id = ?                          │
//! │       AND available = 1 AND quantity >= 1                           │
//! │                                                                     │
//! │  Checkout A and checkout B both want the last unit: the second      │
//! │  UPDATE matches no row and the checkout rolls back.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Seller-side management (`upsert`, `increment`, `decrement`,
//! `withdraw_listing`) is scoped to the owning seller: an entry belonging to
//! someone else is reported as not found.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, StoreResult};
use storefront_core::validation::{validate_quantity, validate_stock_quantity};
use storefront_core::{CoreError, StockEntry};

/// Repository for seller stock.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets the stock entry for a (seller, product) pair.
    pub async fn get(&self, seller_id: &str, product_id: &str) -> DbResult<Option<StockEntry>> {
        fetch_entry(&self.pool, seller_id, product_id).await
    }

    /// Gets a stock entry by ID.
    pub async fn get_by_id(&self, entry_id: &str) -> DbResult<Option<StockEntry>> {
        let entry = sqlx::query_as::<_, StockEntry>(
            r#"
            SELECT id, seller_id, product_id, quantity, available, updated_at
            FROM stock_entries
            WHERE id = ?1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists a seller's stock entries, including withdrawn listings.
    pub async fn list_for_seller(&self, seller_id: &str) -> DbResult<Vec<StockEntry>> {
        let entries = sqlx::query_as::<_, StockEntry>(
            r#"
            SELECT id, seller_id, product_id, quantity, available, updated_at
            FROM stock_entries
            WHERE seller_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(seller_id = %seller_id, count = entries.len(), "Listed stock entries");
        Ok(entries)
    }

    /// Sets the quantity a seller offers for a product, creating the entry if
    /// needed. Re-listing a withdrawn entry makes it available again.
    pub async fn upsert(
        &self,
        seller_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<StockEntry> {
        validate_stock_quantity(quantity)?;

        debug!(seller_id = %seller_id, product_id = %product_id, quantity, "Upserting stock");

        let entry = sqlx::query_as::<_, StockEntry>(
            r#"
            INSERT INTO stock_entries (id, seller_id, product_id, quantity, available, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            ON CONFLICT(seller_id, product_id) DO UPDATE SET
                quantity = excluded.quantity,
                available = 1,
                updated_at = excluded.updated_at
            RETURNING id, seller_id, product_id, quantity, available, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(seller_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Adds one unit to a seller's entry.
    pub async fn increment(&self, entry_id: &str, seller_id: &str) -> DbResult<StockEntry> {
        self.adjust(
            entry_id,
            seller_id,
            "UPDATE stock_entries SET quantity = quantity + 1, updated_at = ?3 \
             WHERE id = ?1 AND seller_id = ?2 \
             RETURNING id, seller_id, product_id, quantity, available, updated_at",
        )
        .await
    }

    /// Removes one unit from a seller's entry. Stops at zero.
    pub async fn decrement(&self, entry_id: &str, seller_id: &str) -> DbResult<StockEntry> {
        self.adjust(
            entry_id,
            seller_id,
            "UPDATE stock_entries SET quantity = MAX(quantity - 1, 0), updated_at = ?3 \
             WHERE id = ?1 AND seller_id = ?2 \
             RETURNING id, seller_id, product_id, quantity, available, updated_at",
        )
        .await
    }

    /// Withdraws a listing. The entry keeps its quantity but can no longer be
    /// bought from.
    pub async fn withdraw_listing(&self, entry_id: &str, seller_id: &str) -> DbResult<StockEntry> {
        self.adjust(
            entry_id,
            seller_id,
            "UPDATE stock_entries SET available = 0, updated_at = ?3 \
             WHERE id = ?1 AND seller_id = ?2 \
             RETURNING id, seller_id, product_id, quantity, available, updated_at",
        )
        .await
    }

    async fn adjust(&self, entry_id: &str, seller_id: &str, sql: &str) -> DbResult<StockEntry> {
        debug!(entry_id = %entry_id, seller_id = %seller_id, "Adjusting stock entry");

        sqlx::query_as::<_, StockEntry>(sql)
            .bind(entry_id)
            .bind(seller_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Stock entry", entry_id))
    }

    // =========================================================================
    // Transaction-scoped primitives
    // =========================================================================

    /// Takes `quantity` units from a seller's stock inside `tx`.
    ///
    /// ## Errors
    /// `CoreError::InsufficientStock` if the entry is missing, withdrawn, or
    /// holds fewer than `quantity` units.
    pub async fn reserve_and_decrement(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        seller_id: &str,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        validate_quantity(quantity)?;

        debug!(seller_id = %seller_id, product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE stock_entries
            SET quantity = quantity - ?3,
                updated_at = ?4
            WHERE seller_id = ?1
              AND product_id = ?2
              AND available = 1
              AND quantity >= ?3
            "#,
        )
        .bind(seller_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let available = fetch_entry(&mut **tx, seller_id, product_id)
                .await?
                .filter(|entry| entry.available)
                .map(|entry| entry.quantity)
                .unwrap_or(0);

            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                seller_id: seller_id.to_string(),
                available,
                requested: quantity,
            }
            .into());
        }

        Ok(())
    }
}

async fn fetch_entry<'e, E>(
    executor: E,
    seller_id: &str,
    product_id: &str,
) -> DbResult<Option<StockEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let entry = sqlx::query_as::<_, StockEntry>(
        r#"
        SELECT id, seller_id, product_id, quantity, available, updated_at
        FROM stock_entries
        WHERE seller_id = ?1 AND product_id = ?2
        "#,
    )
    .bind(seller_id)
    .bind(product_id)
    .fetch_optional(executor)
    .await?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::{Database, DbConfig};
    use storefront_core::{Money, Product};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "p1".to_string(),
                name: "Pad Thai".to_string(),
                description: None,
                price_cents: Money::from_major_minor(10, 0).cents(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_upsert_creates_then_replaces() {
        let db = setup().await;

        let created = db.inventory().upsert("s1", "p1", 5).await.unwrap();
        let replaced = db.inventory().upsert("s1", "p1", 9).await.unwrap();

        assert_eq!(created.id, replaced.id);
        assert_eq!(replaced.quantity, 9);
        assert_eq!(db.inventory().list_for_seller("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_negative_quantity() {
        let db = setup().await;
        let err = db.inventory().upsert("s1", "p1", -1).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_decrement_stops_at_zero() {
        let db = setup().await;
        let entry = db.inventory().upsert("s1", "p1", 1).await.unwrap();

        let entry = db.inventory().decrement(&entry.id, "s1").await.unwrap();
        assert_eq!(entry.quantity, 0);
        let entry = db.inventory().decrement(&entry.id, "s1").await.unwrap();
        assert_eq!(entry.quantity, 0);

        let entry = db.inventory().increment(&entry.id, "s1").await.unwrap();
        assert_eq!(entry.quantity, 1);
    }

    #[tokio::test]
    async fn test_mutations_scoped_to_owner() {
        let db = setup().await;
        let entry = db.inventory().upsert("s1", "p1", 3).await.unwrap();

        let err = db.inventory().increment(&entry.id, "s2").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let unchanged = db.inventory().get_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(unchanged.quantity, 3);
    }

    #[tokio::test]
    async fn test_reserve_and_decrement() {
        let db = setup().await;
        db.inventory().upsert("s1", "p1", 5).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        db.inventory()
            .reserve_and_decrement(&mut tx, "s1", "p1", 2, Utc::now())
            .await
            .unwrap();
        let err = db
            .inventory()
            .reserve_and_decrement(&mut tx, "s1", "p1", 4, Utc::now())
            .await
            .unwrap_err();
        tx.commit().await.unwrap();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            })
        ));
        assert_eq!(db.inventory().get("s1", "p1").await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_withdrawn_listing_cannot_be_bought() {
        let db = setup().await;
        let entry = db.inventory().upsert("s1", "p1", 5).await.unwrap();
        let entry = db.inventory().withdraw_listing(&entry.id, "s1").await.unwrap();
        assert!(!entry.available);
        assert_eq!(entry.quantity, 5);

        let mut tx = db.begin().await.unwrap();
        let err = db
            .inventory()
            .reserve_and_decrement(&mut tx, "s1", "p1", 1, Utc::now())
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_entry_is_insufficient_stock() {
        let db = setup().await;

        let mut tx = db.begin().await.unwrap();
        let err = db
            .inventory()
            .reserve_and_decrement(&mut tx, "s9", "p1", 1, Utc::now())
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientStock { .. })
        ));
    }
}
