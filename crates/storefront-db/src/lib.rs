//! # storefront-db: Database Layer for the Storefront
//!
//! SQLite persistence for accounts, stock, coupons, carts and purchases,
//! plus the checkout coordinator that mutates them atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  Request handler (place order)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   storefront-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ AccountRepo    │   │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │   │              │  │   │
//! │  │   │ Transactions  │    │ CartRepo  ...  │   │              │  │   │
//! │  │   └───────┬───────┘    └────────────────┘   └──────────────┘  │   │
//! │  │           │                     ▲                              │   │
//! │  │           │            ┌────────┴────────┐                     │   │
//! │  │           └───────────►│ CheckoutService │ (checkout.rs)       │   │
//! │  │                        └─────────────────┘                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment-driven configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and store error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - The checkout transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, StoreConfig};
//!
//! let db = Database::new(StoreConfig::load()?.db_config()).await?;
//!
//! let cart = db.carts().get_or_create_open_cart("alice").await?;
//! db.carts().add_item(&cart.id, "pad-thai", "kitchen-42").await?;
//!
//! let purchases = db.checkout().place_order(Some("alice"), Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutService;
pub use config::{ConfigError, StoreConfig};
pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::cart::CartRepository;
pub use repository::coupon::CouponRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
