//! Database operations for the store's `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `users` - Site authentication and admin flags
//! - `categories`, `parts`, `characteristics`, `characteristic_names` - Part catalog
//! - `products`, `product_parts`, `product_images`, `part_images` - Product catalog
//! - `cart_lines` - Pending purchase intents, one row per (user, product)
//! - `orders`, `order_lines` - Placed orders awaiting fulfillment
//! - `countries` - Checkout country selector reference data
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/store/migrations/` and run via:
//! ```bash
//! cargo run -p shoppy-cli -- migrate
//! ```
//!
//! Repositories in this module return fully-materialized aggregates
//! (`OrderDetail`, `ProductDetail`) instead of exposing lazy relations, and
//! batch their relation reads with `= ANY($1)` rather than issuing one query
//! per row.

pub mod cart;
pub mod countries;
pub mod orders;
pub mod parts;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

/// Embedded migrations for the store database.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
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

    /// Constraint violation (e.g., unique email, referenced product).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into `Conflict` with the
    /// given message.
    pub(crate) fn on_unique(e: sqlx::Error, conflict_msg: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_msg.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
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
