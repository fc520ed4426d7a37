//! Database operations for the storefront `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `profiles` - One row per identity-service user (role, display data)
//! - `categories`, `products` - Catalog (read-only here)
//! - `cart_items` - Persisted cart lines, unique per `(user_id, product_id)`
//! - `orders`, `order_items` - Order history
//! - `analytics_events` - Tracked storefront events
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p neonmart-cli -- migrate
//! ```
//!
//! # Store ports
//!
//! The cart services talk to the store through [`CartStore`] and
//! [`ProductCatalog`] so they can run against [`memory::InMemoryStore`] in
//! tests. The `PostgreSQL` implementations live in [`cart_items`] and
//! [`products`].

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use neonmart_core::cart::CartLineItem;
use neonmart_core::{CartItemId, ProductId, UserId};

use crate::models::product::{Product, ProductFilter};

pub mod analytics;
pub mod cart_items;
pub mod memory;
pub mod orders;
pub mod products;
pub mod profiles;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart line).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence for cart lines.
///
/// Implementations must be thread-safe: writes run on spawned tasks.
pub trait CartStore: Send + Sync + 'static {
    /// All lines owned by `user_id`, newest first, with product snapshots.
    fn list_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLineItem>, RepositoryError>> + Send;

    /// Insert the line, or overwrite the quantity of the row with the same ID.
    fn save_line(
        &self,
        line: &CartLineItem,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete the line. Deleting a missing line is not an error.
    fn delete_line(
        &self,
        id: CartItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync + 'static {
    /// Get a product by ID.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Active products matching `filter`, sorted and limited.
    fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Reduce a result set that must contain exactly one row.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` for zero rows and
/// `RepositoryError::DataCorruption` for more than one.
pub fn exactly_one<T>(rows: Vec<T>, what: &str) -> Result<T, RepositoryError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(RepositoryError::NotFound),
        _ => Err(RepositoryError::DataCorruption(format!(
            "expected exactly one {what}, found {count}"
        ))),
    }
}
