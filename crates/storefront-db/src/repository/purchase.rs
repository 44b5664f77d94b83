//! # Purchase Repository
//!
//! Append-only audit records, one per checked-out line item. Purchases are
//! only ever written inside a checkout transaction.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;
use storefront_core::Purchase;

/// Repository for purchase records.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a purchase inside `tx`.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        purchase: &Purchase,
    ) -> DbResult<()> {
        debug!(
            line_item_id = %purchase.line_item_id,
            price_paid = %purchase.price_paid(),
            "Recording purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, line_item_id, buyer_id, cart_id, price_paid_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.line_item_id)
        .bind(&purchase.buyer_id)
        .bind(&purchase.cart_id)
        .bind(purchase.price_paid_cents)
        .bind(purchase.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Purchases of one cart, in line item order.
    pub async fn list_for_cart(&self, cart_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, line_item_id, buyer_id, cart_id, price_paid_cents, created_at
            FROM purchases
            WHERE cart_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// A buyer's purchase history, oldest first.
    pub async fn list_for_buyer(&self, buyer_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, line_item_id, buyer_id, cart_id, price_paid_cents, created_at
            FROM purchases
            WHERE buyer_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }
}
