//! # Product Repository
//!
//! Catalog access. Checkout never reads the catalog: it trusts the unit
//! price snapshotted onto each line item by the cart.
//!
//! ## Price Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(cart, product P1, seller S1)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_price(P1) ──► $10.00   (active products only)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart_line_items.unit_price_cents = 1000   (frozen)                     │
//! │                                                                         │
//! │  Later catalog price changes do not touch the open cart.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, StoreResult};
use storefront_core::validation::{validate_price_cents, validate_product_name};
use storefront_core::{Money, Product};

/// Repository for catalog products.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, including inactive products.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Current list price of an active product.
    ///
    /// ## Returns
    /// * `Ok(Some(price))` - Product is for sale
    /// * `Ok(None)` - Product missing or soft-deleted
    pub async fn get_price(&self, id: &str) -> DbResult<Option<Money>> {
        let price: Option<i64> =
            sqlx::query_scalar("SELECT price_cents FROM products WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(price.map(Money::from_cents))
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(StoreError::Db(DbError::UniqueViolation))` - ID already exists
    pub async fn insert(&self, product: &Product) -> StoreResult<Product> {
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Line items already in carts keep their snapshot; the product can no
    /// longer be added.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(id: &str, name: &str, price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_get_price_only_for_active_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = generate_product_id();
        db.products()
            .insert(&product(&id, "Tom Yum", 1450))
            .await
            .unwrap();

        assert_eq!(
            db.products().get_price(&id).await.unwrap(),
            Some(Money::from_cents(1450))
        );

        db.products().soft_delete(&id).await.unwrap();
        assert_eq!(db.products().get_price(&id).await.unwrap(), None);
        assert!(db.products().get_by_id(&id).await.unwrap().is_some());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_active_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("b", "Satay", 900)).await.unwrap();
        db.products().insert(&product("a", "Laab", 1100)).await.unwrap();

        let names: Vec<String> = db
            .products()
            .list_active(10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Laab", "Satay"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.products().insert(&product("x", "  ", 100)).await.is_err());
    }
}
