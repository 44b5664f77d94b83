//! # Coupon Repository
//!
//! Persistence for issued coupons. Coupons are never updated after issue;
//! evaluation against a cart lives in `storefront_core::coupon`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use storefront_core::validation::{validate_coupon_code, validate_percent_off};
use storefront_core::Coupon;

/// Repository for coupons.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Resolves a coupon code.
    pub async fn get(&self, code: &str) -> DbResult<Option<Coupon>> {
        fetch_coupon(&self.pool, code).await
    }

    /// Resolves a coupon code inside `tx`.
    pub async fn get_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        code: &str,
    ) -> DbResult<Option<Coupon>> {
        fetch_coupon(&mut **tx, code).await
    }

    /// Stores a newly issued coupon.
    ///
    /// ## Errors
    /// - `ValidationError` for a malformed code or percent outside 1-100
    /// - `DbError::UniqueViolation` if the code is taken
    /// - `DbError::ForeignKeyViolation` if the product is not in the catalog
    pub async fn issue(&self, coupon: &Coupon) -> StoreResult<Coupon> {
        let code = validate_coupon_code(&coupon.code)?;
        validate_percent_off(coupon.percent_off)?;

        debug!(
            code = %code,
            product_id = %coupon.product_id,
            seller_id = %coupon.seller_id,
            percent_off = coupon.percent_off,
            "Issuing coupon"
        );

        let coupon = Coupon {
            code,
            ..coupon.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                code, product_id, seller_id, percent_off, expiration_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&coupon.code)
        .bind(&coupon.product_id)
        .bind(&coupon.seller_id)
        .bind(coupon.percent_off)
        .bind(coupon.expiration_date)
        .bind(coupon.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("coupon code", &coupon.code),
            other => other,
        })?;

        Ok(coupon)
    }

    /// The unexpired coupon for a (product, seller) pair that lasts longest,
    /// if any.
    pub async fn current_for(
        &self,
        product_id: &str,
        seller_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT code, product_id, seller_id, percent_off, expiration_date, created_at
            FROM coupons
            WHERE product_id = ?1 AND seller_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        // Expiry is compared in Rust; stored timestamps are text.
        Ok(coupons
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .max_by_key(|c| c.expiration_date))
    }
}

async fn fetch_coupon<'e, E>(executor: E, code: &str) -> DbResult<Option<Coupon>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let coupon = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT code, product_id, seller_id, percent_off, expiration_date, created_at
        FROM coupons
        WHERE code = ?1
        "#,
    )
    .bind(code.trim())
    .fetch_optional(executor)
    .await?;

    Ok(coupon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use storefront_core::{CoreError, Product};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "p1".to_string(),
                name: "Green Curry".to_string(),
                description: None,
                price_cents: 1200,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db
    }

    fn coupon(code: &str, percent_off: u32, expires_in: Duration) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: code.to_string(),
            product_id: "p1".to_string(),
            seller_id: "s1".to_string(),
            percent_off,
            expiration_date: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_issue_and_get() {
        let db = setup().await;
        db.coupons()
            .issue(&coupon("SAVE20", 20, Duration::days(7)))
            .await
            .unwrap();

        let stored = db.coupons().get("SAVE20").await.unwrap().unwrap();
        assert_eq!(stored.percent_off, 20);
        assert!(db.coupons().get("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_rejects_duplicates_and_bad_percent() {
        let db = setup().await;
        db.coupons()
            .issue(&coupon("SAVE20", 20, Duration::days(7)))
            .await
            .unwrap();

        let err = db
            .coupons()
            .issue(&coupon("SAVE20", 10, Duration::days(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Db(DbError::UniqueViolation { .. })));

        let err = db
            .coupons()
            .issue(&coupon("FREE", 0, Duration::days(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_current_for_skips_expired() {
        let db = setup().await;
        db.coupons()
            .issue(&coupon("OLD", 50, -Duration::days(1)))
            .await
            .unwrap();
        db.coupons()
            .issue(&coupon("NEW", 10, Duration::days(3)))
            .await
            .unwrap();

        let current = db
            .coupons()
            .current_for("p1", "s1", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.code, "NEW");
        assert!(db
            .coupons()
            .current_for("p1", "s2", Utc::now())
            .await
            .unwrap()
            .is_none());
    }
}
