//! Admin flag management.

use shoppy_core::Email;
use shoppy_store::db::users::UserRepository;

/// Set or clear a user's admin flag.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(email)?;

    let pool = super::connect().await?;
    UserRepository::new(&pool).set_admin(&email, is_admin).await?;

    tracing::info!(email = %email, is_admin, "admin flag updated");
    Ok(())
}
