//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;

use shoppy_store::config::StoreConfig;
use shoppy_store::db;

/// Connect to the store database using the environment configuration.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url = StoreConfig::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    Ok(pool)
}
