//! # Cart Repository
//!
//! Carts and their line items.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── get_or_create_open_cart() → Cart { status: Open }              │
//! │                                                                         │
//! │  2. EDIT (open carts only)                                             │
//! │     └── add_item() / increase_quantity() / decrease_quantity()         │
//! │     └── remove_item() / apply_coupon()                                 │
//! │                                                                         │
//! │  3. CHECKOUT (inside the checkout transaction)                         │
//! │     └── mark_purchased() → Cart { status: Purchased }  (terminal)      │
//! │     └── create_open_cart() → next Cart { status: Open }                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A partial unique index keeps at most one open cart per user. Editing
//! operations run in `BEGIN IMMEDIATE` transactions, so an edit and a
//! checkout of the same cart never interleave.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use crate::pool::begin_immediate;
use crate::repository::coupon::CouponRepository;
use crate::repository::product::ProductRepository;
use storefront_core::coupon::{preview_total, validate_for_checkout};
use storefront_core::validation::{validate_cart_size, validate_coupon_code};
use storefront_core::{
    Cart, CartLineItem, CartStatus, CheckoutError, CoreError, Coupon, Money, MAX_ITEM_QUANTITY,
};

/// Repository for carts and line items.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a cart by ID.
    pub async fn get_by_id(&self, cart_id: &str) -> DbResult<Option<Cart>> {
        fetch_cart(&self.pool, cart_id).await
    }

    /// Gets the user's open cart, if one exists.
    pub async fn get_open_cart(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, owner_user_id, status, applied_coupon_code, created_at, purchased_at
            FROM carts
            WHERE owner_user_id = ?1 AND status = 'open'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Gets the user's open cart, creating an empty one if needed.
    pub async fn get_or_create_open_cart(&self, user_id: &str) -> DbResult<Cart> {
        if let Some(cart) = self.get_open_cart(user_id).await? {
            return Ok(cart);
        }

        let mut tx = self.pool.begin().await?;
        let created = self.create_open_cart(&mut tx, user_id, Utc::now()).await;
        match created {
            Ok(cart) => {
                tx.commit().await?;
                Ok(cart)
            }
            // Lost a race with another request creating the same cart
            Err(DbError::UniqueViolation { .. }) => {
                tx.rollback().await?;
                self.get_open_cart(user_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Open cart", user_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Line items of a cart in insertion order.
    pub async fn get_line_items(&self, cart_id: &str) -> DbResult<Vec<CartLineItem>> {
        fetch_line_items(&self.pool, cart_id).await
    }

    /// Gets a line item by ID.
    pub async fn get_line_item(&self, line_item_id: &str) -> DbResult<Option<CartLineItem>> {
        fetch_line_item(&self.pool, line_item_id).await
    }

    /// Display-time total of a cart.
    ///
    /// Applies the cart's coupon without checking expiry. Checkout
    /// recomputes prices on its own.
    pub async fn preview_total(&self, cart_id: &str) -> StoreResult<Money> {
        let cart = self
            .get_by_id(cart_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", cart_id))?;
        let items = self.get_line_items(cart_id).await?;

        let coupon = match &cart.applied_coupon_code {
            Some(code) => CouponRepository::new(self.pool.clone()).get(code).await?,
            None => None,
        };

        Ok(preview_total(&items, coupon.as_ref())?)
    }

    // =========================================================================
    // Transaction-scoped primitives
    // =========================================================================

    /// Gets a cart by ID inside `tx`.
    pub async fn get_by_id_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart_id: &str,
    ) -> DbResult<Option<Cart>> {
        fetch_cart(&mut **tx, cart_id).await
    }

    /// Line items of a cart inside `tx`, in insertion order.
    pub async fn get_line_items_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart_id: &str,
    ) -> DbResult<Vec<CartLineItem>> {
        fetch_line_items(&mut **tx, cart_id).await
    }

    /// Creates a new empty open cart inside `tx`.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the user already has an open cart.
    pub async fn create_open_cart(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Cart> {
        let cart = Cart::open_for(user_id, now);

        debug!(cart_id = %cart.id, user_id = %user_id, "Creating open cart");

        sqlx::query(
            r#"
            INSERT INTO carts (
                id, owner_user_id, status, applied_coupon_code, created_at, purchased_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.owner_user_id)
        .bind(cart.status)
        .bind(&cart.applied_coupon_code)
        .bind(cart.created_at)
        .bind(cart.purchased_at)
        .execute(&mut **tx)
        .await?;

        Ok(cart)
    }

    /// Moves a cart from open to purchased inside `tx`.
    ///
    /// The transition is a conditional update, so a cart is checked out at
    /// most once even when two checkouts race.
    ///
    /// ## Errors
    /// - `CheckoutError::CartNotFound` if the cart is missing or not owned
    ///   by `owner_user_id`
    /// - `CheckoutError::CartNotOpen` if it is already purchased
    pub async fn mark_purchased(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart_id: &str,
        owner_user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        debug!(cart_id = %cart_id, "Marking cart purchased");

        let result = sqlx::query(
            r#"
            UPDATE carts
            SET status = 'purchased',
                purchased_at = ?3
            WHERE id = ?1 AND owner_user_id = ?2 AND status = 'open'
            "#,
        )
        .bind(cart_id)
        .bind(owner_user_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let err = match fetch_cart(&mut **tx, cart_id).await? {
                Some(cart) if cart.owner_user_id == owner_user_id => {
                    CheckoutError::CartNotOpen(cart_id.to_string())
                }
                _ => CheckoutError::CartNotFound(cart_id.to_string()),
            };
            return Err(err.into());
        }

        Ok(())
    }

    // =========================================================================
    // Cart editing
    // =========================================================================

    /// Adds one unit of a seller's product to an open cart.
    ///
    /// If the cart already holds that (product, seller) pair the existing
    /// line is incremented and keeps its price snapshot. Otherwise a new
    /// line is created at the current catalog price.
    ///
    /// ## Errors
    /// - `CoreError::ProductUnavailable` if the product is missing or inactive
    /// - `CoreError::InvalidCartStatus` if the cart is not open
    /// - `CoreError::CartTooLarge` / `CoreError::QuantityTooLarge`
    pub async fn add_item(
        &self,
        cart_id: &str,
        product_id: &str,
        seller_id: &str,
    ) -> StoreResult<CartLineItem> {
        let unit_price = ProductRepository::new(self.pool.clone())
            .get_price(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductUnavailable(product_id.to_string()))?;

        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;
        ensure_open(&mut tx, cart_id).await?;

        let existing = sqlx::query_as::<_, CartLineItem>(
            r#"
            SELECT id, cart_id, product_id, seller_id, quantity, unit_price_cents, added_at
            FROM cart_line_items
            WHERE cart_id = ?1 AND product_id = ?2 AND seller_id = ?3
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(seller_id)
        .fetch_optional(&mut *tx)
        .await?;

        let item = match existing {
            Some(item) => increment_line(&mut tx, item).await?,
            None => {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM cart_line_items WHERE cart_id = ?1")
                        .bind(cart_id)
                        .fetch_one(&mut *tx)
                        .await?;
                validate_cart_size(usize::try_from(count).unwrap_or(usize::MAX))?;

                let item = CartLineItem::single_unit(cart_id, product_id, seller_id, unit_price, now);
                insert_line(&mut tx, &item).await?;
                item
            }
        };

        tx.commit().await?;

        debug!(
            cart_id = %cart_id,
            line_item_id = %item.id,
            quantity = item.quantity,
            "Item added to cart"
        );
        Ok(item)
    }

    /// Adds one unit to a line item.
    pub async fn increase_quantity(&self, line_item_id: &str) -> StoreResult<CartLineItem> {
        let mut tx = begin_immediate(&self.pool).await?;
        let item = open_line_item(&mut tx, line_item_id).await?;
        let item = increment_line(&mut tx, item).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Removes one unit from a line item. The line is deleted when its
    /// quantity reaches zero, in which case `None` is returned.
    pub async fn decrease_quantity(&self, line_item_id: &str) -> StoreResult<Option<CartLineItem>> {
        let mut tx = begin_immediate(&self.pool).await?;
        let mut item = open_line_item(&mut tx, line_item_id).await?;

        let remaining = if item.quantity <= 1 {
            delete_line(&mut tx, line_item_id).await?;
            None
        } else {
            sqlx::query("UPDATE cart_line_items SET quantity = quantity - 1 WHERE id = ?1")
                .bind(line_item_id)
                .execute(&mut *tx)
                .await?;
            item.quantity -= 1;
            Some(item)
        };

        tx.commit().await?;
        Ok(remaining)
    }

    /// Removes a line item from an open cart.
    pub async fn remove_item(&self, line_item_id: &str) -> StoreResult<()> {
        let mut tx = begin_immediate(&self.pool).await?;
        open_line_item(&mut tx, line_item_id).await?;
        delete_line(&mut tx, line_item_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Records a coupon on an open cart after checking it against the
    /// cart's current contents.
    ///
    /// ## Errors
    /// - `CheckoutError::CouponNotFound` for an unknown code
    /// - `CheckoutError::CouponExpired` if it expired before `now`
    /// - `CheckoutError::CouponNotApplicable` if no line matches its scope
    /// - `CoreError::InvalidCartStatus` if the cart is not open
    pub async fn apply_coupon(
        &self,
        cart_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Coupon> {
        let code = validate_coupon_code(code)?;
        let coupon = CouponRepository::new(self.pool.clone())
            .get(&code)
            .await?
            .ok_or_else(|| CheckoutError::CouponNotFound(code.clone()))?;

        let mut tx = begin_immediate(&self.pool).await?;
        ensure_open(&mut tx, cart_id).await?;

        let items = fetch_line_items(&mut *tx, cart_id).await?;
        validate_for_checkout(&coupon, &items, now)?;

        sqlx::query("UPDATE carts SET applied_coupon_code = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(&coupon.code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(cart_id = %cart_id, code = %coupon.code, "Coupon applied");
        Ok(coupon)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_cart<'e, E>(executor: E, cart_id: &str) -> DbResult<Option<Cart>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cart = sqlx::query_as::<_, Cart>(
        r#"
        SELECT id, owner_user_id, status, applied_coupon_code, created_at, purchased_at
        FROM carts
        WHERE id = ?1
        "#,
    )
    .bind(cart_id)
    .fetch_optional(executor)
    .await?;

    Ok(cart)
}

async fn fetch_line_items<'e, E>(executor: E, cart_id: &str) -> DbResult<Vec<CartLineItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, CartLineItem>(
        r#"
        SELECT id, cart_id, product_id, seller_id, quantity, unit_price_cents, added_at
        FROM cart_line_items
        WHERE cart_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(cart_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

async fn fetch_line_item<'e, E>(executor: E, line_item_id: &str) -> DbResult<Option<CartLineItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let item = sqlx::query_as::<_, CartLineItem>(
        r#"
        SELECT id, cart_id, product_id, seller_id, quantity, unit_price_cents, added_at
        FROM cart_line_items
        WHERE id = ?1
        "#,
    )
    .bind(line_item_id)
    .fetch_optional(executor)
    .await?;

    Ok(item)
}

/// Loads a cart inside `tx` and checks that it can still be edited.
async fn ensure_open(tx: &mut Transaction<'_, Sqlite>, cart_id: &str) -> StoreResult<Cart> {
    let cart = fetch_cart(&mut **tx, cart_id)
        .await?
        .ok_or_else(|| DbError::not_found("Cart", cart_id))?;

    if cart.status != CartStatus::Open {
        return Err(CoreError::InvalidCartStatus {
            cart_id: cart.id,
            status: cart.status,
        }
        .into());
    }

    Ok(cart)
}

/// Loads a line item whose cart is still open.
async fn open_line_item(
    tx: &mut Transaction<'_, Sqlite>,
    line_item_id: &str,
) -> StoreResult<CartLineItem> {
    let item = fetch_line_item(&mut **tx, line_item_id)
        .await?
        .ok_or_else(|| DbError::not_found("Line item", line_item_id))?;
    ensure_open(tx, &item.cart_id).await?;

    Ok(item)
}

async fn increment_line(
    tx: &mut Transaction<'_, Sqlite>,
    mut item: CartLineItem,
) -> StoreResult<CartLineItem> {
    if item.quantity >= MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: item.quantity + 1,
            max: MAX_ITEM_QUANTITY,
        }
        .into());
    }

    sqlx::query("UPDATE cart_line_items SET quantity = quantity + 1 WHERE id = ?1")
        .bind(&item.id)
        .execute(&mut **tx)
        .await?;
    item.quantity += 1;

    Ok(item)
}

async fn insert_line(tx: &mut Transaction<'_, Sqlite>, item: &CartLineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_line_items (
            id, cart_id, product_id, seller_id, quantity, unit_price_cents, added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.cart_id)
    .bind(&item.product_id)
    .bind(&item.seller_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.added_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn delete_line(tx: &mut Transaction<'_, Sqlite>, line_item_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM cart_line_items WHERE id = ?1")
        .bind(line_item_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use storefront_core::Product;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        for (id, name, price) in [("p1", "Pad See Ew", 1000), ("p2", "Massaman", 3000)] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: None,
                    price_cents: price,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_one_open_cart_per_user() {
        let db = setup().await;
        let first = db.carts().get_or_create_open_cart("u1").await.unwrap();
        let second = db.carts().get_or_create_open_cart("u1").await.unwrap();
        assert_eq!(first.id, second.id);

        let mut tx = db.begin().await.unwrap();
        let err = db
            .carts()
            .create_open_cart(&mut tx, "u1", Utc::now())
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_add_item_merges_same_product_and_seller() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();

        let a = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();
        let b = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();
        db.carts().add_item(&cart.id, "p1", "s2").await.unwrap();
        db.carts().add_item(&cart.id, "p2", "s1").await.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.quantity, 2);

        let items = db.carts().get_line_items(&cart.id).await.unwrap();
        let pairs: Vec<(&str, &str, i64)> = items
            .iter()
            .map(|i| (i.product_id.as_str(), i.seller_id.as_str(), i.quantity))
            .collect();
        assert_eq!(pairs, vec![("p1", "s1", 2), ("p1", "s2", 1), ("p2", "s1", 1)]);
    }

    #[tokio::test]
    async fn test_add_item_snapshots_price() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        let item = db.carts().add_item(&cart.id, "p2", "s1").await.unwrap();

        sqlx::query("UPDATE products SET price_cents = 9999 WHERE id = 'p2'")
            .execute(db.pool())
            .await
            .unwrap();

        let stored = db.carts().get_line_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.unit_price_cents, 3000);
    }

    #[tokio::test]
    async fn test_add_inactive_product_fails() {
        let db = setup().await;
        db.products().soft_delete("p1").await.unwrap();
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();

        let err = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::ProductUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_quantity_edits() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        let item = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();

        let item = db.carts().increase_quantity(&item.id).await.unwrap();
        assert_eq!(item.quantity, 2);

        let item = db.carts().decrease_quantity(&item.id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 1);

        assert!(db.carts().decrease_quantity(&item.id).await.unwrap().is_none());
        assert!(db.carts().get_line_items(&cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_item() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        let item = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();

        db.carts().remove_item(&item.id).await.unwrap();
        assert!(db.carts().get_line_item(&item.id).await.unwrap().is_none());

        let err = db.carts().remove_item(&item.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Db(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_purchased_cart_is_frozen() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        let item = db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        db.carts()
            .mark_purchased(&mut tx, &cart.id, "u1", Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = db.carts().add_item(&cart.id, "p2", "s1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InvalidCartStatus {
                status: CartStatus::Purchased,
                ..
            })
        ));
        assert!(db.carts().increase_quantity(&item.id).await.is_err());
        assert!(db.carts().remove_item(&item.id).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_purchased_only_once() {
        let db = setup().await;
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        db.carts()
            .mark_purchased(&mut tx, &cart.id, "u1", Utc::now())
            .await
            .unwrap();
        let again = db
            .carts()
            .mark_purchased(&mut tx, &cart.id, "u1", Utc::now())
            .await
            .unwrap_err();
        let foreign = db
            .carts()
            .mark_purchased(&mut tx, &cart.id, "u2", Utc::now())
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert_eq!(
            again.as_checkout(),
            Some(&CheckoutError::CartNotOpen(cart.id.clone()))
        );
        assert_eq!(
            foreign.as_checkout(),
            Some(&CheckoutError::CartNotFound(cart.id.clone()))
        );
    }

    #[tokio::test]
    async fn test_apply_coupon() {
        let db = setup().await;
        let now = Utc::now();
        db.coupons()
            .issue(&Coupon {
                code: "SAVE20".to_string(),
                product_id: "p1".to_string(),
                seller_id: "s1".to_string(),
                percent_off: 20,
                expiration_date: now + Duration::days(1),
                created_at: now,
            })
            .await
            .unwrap();
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        db.carts().add_item(&cart.id, "p2", "s1").await.unwrap();

        let err = db.carts().apply_coupon(&cart.id, "SAVE20", now).await.unwrap_err();
        assert!(matches!(
            err.as_checkout(),
            Some(CheckoutError::CouponNotApplicable { .. })
        ));

        let err = db.carts().apply_coupon(&cart.id, "MISSING", now).await.unwrap_err();
        assert_eq!(
            err.as_checkout(),
            Some(&CheckoutError::CouponNotFound("MISSING".to_string()))
        );

        db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();
        db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();
        db.carts().apply_coupon(&cart.id, "SAVE20", now).await.unwrap();

        let cart = db.carts().get_by_id(&cart.id).await.unwrap().unwrap();
        assert_eq!(cart.applied_coupon_code.as_deref(), Some("SAVE20"));
        assert_eq!(
            db.carts().preview_total(&cart.id).await.unwrap().cents(),
            3000 + 1600
        );
    }

    #[tokio::test]
    async fn test_apply_expired_coupon_fails() {
        let db = setup().await;
        let now = Utc::now();
        db.coupons()
            .issue(&Coupon {
                code: "LATE".to_string(),
                product_id: "p1".to_string(),
                seller_id: "s1".to_string(),
                percent_off: 50,
                expiration_date: now - Duration::hours(1),
                created_at: now - Duration::days(2),
            })
            .await
            .unwrap();
        let cart = db.carts().get_or_create_open_cart("u1").await.unwrap();
        db.carts().add_item(&cart.id, "p1", "s1").await.unwrap();

        let err = db.carts().apply_coupon(&cart.id, "LATE", now).await.unwrap_err();
        assert_eq!(
            err.as_checkout(),
            Some(&CheckoutError::CouponExpired {
                code: "LATE".to_string()
            })
        );
    }
}
