//! Country reference-data repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::catalog::Country;

/// Repository for the checkout country selector reference data.
pub struct CountryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CountryRepository<'a> {
    /// Create a new country repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Replace the country list wholesale. Used by the CLI seeder.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn replace_all(&self, countries: &[(String, String)]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM countries").execute(&mut *tx).await?;

        for (name, code) in countries {
            sqlx::query("INSERT INTO countries (code, name) VALUES ($1, $2)")
                .bind(code)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List all countries, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Country>, RepositoryError> {
        let countries =
            sqlx::query_as::<_, Country>("SELECT code, name FROM countries ORDER BY name")
                .fetch_all(self.pool)
                .await?;
        Ok(countries)
    }
}
