//! Product repository: catalog CRUD, bill-of-materials links, image rows.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use shoppy_core::{PartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::catalog::{PartRef, Product, ProductDetail, ProductImage, ProductSummary};

/// Fields for a new or updated product record.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub made_by_user: bool,
    /// Bill of materials. Must be deduplicated; unknown ids abort the write.
    pub part_ids: Vec<PartId>,
    /// Image filenames, already stored on disk, in display order.
    pub image_filenames: Vec<String>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, description, made_by_user FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// List the admin-catalogued products (not user builds) with their images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_catalog(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, description, made_by_user
            FROM products
            WHERE made_by_user = FALSE
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = products.iter().map(|p| p.id.as_i32()).collect();
        let mut images = images_by_product(self.pool, &ids).await?;

        Ok(products
            .into_iter()
            .map(|product| {
                let images = images.remove(&product.id).unwrap_or_default();
                ProductSummary { product, images }
            })
            .collect())
    }

    /// Get a fully-materialized product: images plus bill of materials.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };

        let mut images = images_by_product(self.pool, &[id.as_i32()]).await?;
        let parts = sqlx::query_as::<_, PartRef>(
            r"
            SELECT p.id, p.name, c.name AS category
            FROM product_parts pp
            JOIN parts p ON p.id = pp.part_id
            JOIN categories c ON c.id = p.category_id
            WHERE pp.product_id = $1
            ORDER BY p.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ProductDetail {
            images: images.remove(&product.id).unwrap_or_default(),
            product,
            parts,
        }))
    }

    /// Create a product with its part links and image rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any part id does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: ProductRecord) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Create a user-composed product and put it straight into the user's
    /// cart, as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any part id does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_user_build(
        &self,
        user_id: UserId,
        record: ProductRecord,
        quantity: i32,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, &record).await?;

        sqlx::query(
            r"
            INSERT INTO cart_lines (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user_id)
        .bind(product.id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Update a product: fields and bill of materials are always replaced;
    /// image rows are replaced only when `replace_images` is set.
    ///
    /// Returns the filenames of any replaced image rows so the caller can
    /// remove the files from disk (best-effort).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or a part id does
    /// not exist. Returns `RepositoryError::Database` for other errors.
    pub async fn update(
        &self,
        id: ProductId,
        record: ProductRecord,
        replace_images: bool,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET name = $1, price = $2, description = $3 WHERE id = $4",
        )
        .bind(&record.name)
        .bind(record.price)
        .bind(&record.description)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Parts list is fully replaced, never merged.
        sqlx::query("DELETE FROM product_parts WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_parts(&mut tx, id, &record.part_ids).await?;

        let mut removed = Vec::new();
        if replace_images {
            removed = sqlx::query_scalar::<_, String>(
                "DELETE FROM product_images WHERE product_id = $1 RETURNING filename",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            insert_images(&mut tx, id, &record.image_filenames).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Delete a product, its image rows, and any cart lines referencing it.
    ///
    /// Returns the filenames of the deleted image rows so the caller can
    /// remove the files from disk (best-effort).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any order line references the
    /// product. Returns `RepositoryError::NotFound` if the product does not
    /// exist. Returns `RepositoryError::Database` for other errors.
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM order_lines WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(RepositoryError::Conflict(
                "You can't delete this product, some users have it in their orders.".to_owned(),
            ));
        }

        let filenames = sqlx::query_scalar::<_, String>(
            "DELETE FROM product_images WHERE product_id = $1 RETURNING filename",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_lines WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(filenames)
    }
}

/// Insert a product row, its part links, and its image rows.
async fn insert_product(
    tx: &mut Transaction<'_, Postgres>,
    record: &ProductRecord,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO products (name, price, description, made_by_user)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, price, description, made_by_user
        ",
    )
    .bind(&record.name)
    .bind(record.price)
    .bind(&record.description)
    .bind(record.made_by_user)
    .fetch_one(&mut **tx)
    .await?;

    link_parts(tx, product.id, &record.part_ids).await?;
    insert_images(tx, product.id, &record.image_filenames).await?;

    Ok(product)
}

/// Link a product to its parts. Aborts if any part id is unknown.
async fn link_parts(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    part_ids: &[PartId],
) -> Result<(), RepositoryError> {
    if part_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = part_ids.iter().map(PartId::as_i32).collect();
    let result = sqlx::query(
        r"
        INSERT INTO product_parts (product_id, part_id)
        SELECT $1, id FROM parts WHERE id = ANY($2)
        ",
    )
    .bind(product_id)
    .bind(&ids)
    .execute(&mut **tx)
    .await?;

    // Fewer rows than requested means a part id didn't resolve.
    if result.rows_affected() != ids.len() as u64 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Insert image rows in display order.
async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    filenames: &[String],
) -> Result<(), RepositoryError> {
    for (position, filename) in filenames.iter().enumerate() {
        sqlx::query("INSERT INTO product_images (product_id, filename, position) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(filename)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Batch-load images for a set of products, grouped by owner.
async fn images_by_product(
    pool: &PgPool,
    product_ids: &[i32],
) -> Result<HashMap<ProductId, Vec<ProductImage>>, RepositoryError> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, ProductImage>(
        r"
        SELECT id, product_id, filename, position
        FROM product_images
        WHERE product_id = ANY($1)
        ORDER BY product_id, position
        ",
    )
    .bind(product_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
    for image in rows {
        grouped.entry(image.product_id).or_default().push(image);
    }
    Ok(grouped)
}
