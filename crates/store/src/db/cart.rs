//! Cart repository: per-user cart lines.

use sqlx::PgPool;

use shoppy_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::catalog::Product;
use crate::models::order::CartEntry;

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a product to a user's cart. Repeated adds for the same product sum
    /// their quantities.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_lines (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("product does not exist".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Remove a product from a user's cart.
    ///
    /// Returns `true` if a line was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a user's cart, each line materialized with its product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn entries(&self, user_id: UserId) -> Result<Vec<CartEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartEntryRow>(
            r"
            SELECT p.id, p.name, p.price, p.description, p.made_by_user, cl.quantity
            FROM cart_lines cl
            JOIN products p ON p.id = cl.product_id
            WHERE cl.user_id = $1
            ORDER BY p.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartEntryRow::into_entry).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CartEntryRow {
    id: ProductId,
    name: String,
    price: rust_decimal::Decimal,
    description: Option<String>,
    made_by_user: bool,
    quantity: i32,
}

impl CartEntryRow {
    fn into_entry(self) -> CartEntry {
        CartEntry {
            product: Product {
                id: self.id,
                name: self.name,
                price: self.price,
                description: self.description,
                made_by_user: self.made_by_user,
            },
            quantity: self.quantity,
        }
    }
}
