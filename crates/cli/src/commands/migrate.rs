//! Database migration command.

use shoppy_store::db::MIGRATOR;

/// Run the embedded store migrations.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("running store migrations");
    MIGRATOR.run(&pool).await?;
    tracing::info!("migrations complete");

    Ok(())
}
