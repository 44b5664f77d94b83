//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Transaction-scoped primitives       Self-contained operations          │
//! │  ─────────────────────────────       ─────────────────────────          │
//! │  take `&mut Transaction`             open and commit their own          │
//! │  never commit                        short transaction (or run one      │
//! │                                      statement on the pool)             │
//! │                                                                         │
//! │  accounts.debit / credit             accounts.deposit / withdraw        │
//! │  inventory.reserve_and_decrement     inventory.upsert / increment       │
//! │  carts.mark_purchased                carts.add_item / apply_coupon      │
//! │  carts.create_open_cart              coupons.issue                      │
//! │  purchases.insert                                                       │
//! │                                                                         │
//! │  The checkout coordinator composes the left column inside one          │
//! │  transaction.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Balances
//! - [`InventoryRepository`](inventory::InventoryRepository) - Seller stock
//! - [`CouponRepository`](coupon::CouponRepository) - Issued coupons
//! - [`CartRepository`](cart::CartRepository) - Carts and line items
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchase records
//! - [`ProductRepository`](product::ProductRepository) - Catalog lookups

pub mod account;
pub mod cart;
pub mod coupon;
pub mod inventory;
pub mod product;
pub mod purchase;
