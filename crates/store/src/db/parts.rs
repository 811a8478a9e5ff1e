//! Part repository: categories, characteristics, part CRUD.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use shoppy_core::{CategoryId, CharacteristicNameId, PartId};

use super::RepositoryError;
use crate::models::catalog::{
    Category, CategoryParts, Characteristic, CharacteristicName, Part, PartDetail, PartImage,
};

/// Fields for a new part record.
#[derive(Debug, Clone)]
pub struct PartRecord {
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
    /// Resolved (label id, value) pairs.
    pub characteristics: Vec<(CharacteristicNameId, String)>,
    /// Image filenames, already stored on disk, in display order.
    pub image_filenames: Vec<String>,
}

/// Repository for part database operations.
pub struct PartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PartRepository<'a> {
    /// Create a new part repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all part categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }

    /// List the catalog of characteristic labels.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_characteristic_names(
        &self,
    ) -> Result<Vec<CharacteristicName>, RepositoryError> {
        let names = sqlx::query_as::<_, CharacteristicName>(
            "SELECT id, name FROM characteristic_names ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(names)
    }

    /// Resolve a characteristic label to its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve_characteristic_name(
        &self,
        name: &str,
    ) -> Result<Option<CharacteristicNameId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CharacteristicNameId>(
            "SELECT id FROM characteristic_names WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Create a part with its characteristics and image rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: PartRecord) -> Result<Part, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let part = sqlx::query_as::<_, Part>(
            r"
            INSERT INTO parts (name, price, category_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, category_id
            ",
        )
        .bind(&record.name)
        .bind(record.price)
        .bind(record.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        for (name_id, value) in &record.characteristics {
            let characteristic_id = sqlx::query_scalar::<_, i32>(
                "INSERT INTO characteristics (name_id, value) VALUES ($1, $2) RETURNING id",
            )
            .bind(name_id)
            .bind(value)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO part_characteristics (part_id, characteristic_id) VALUES ($1, $2)",
            )
            .bind(part.id)
            .bind(characteristic_id)
            .execute(&mut *tx)
            .await?;
        }

        for (position, filename) in record.image_filenames.iter().enumerate() {
            sqlx::query("INSERT INTO part_images (part_id, filename, position) VALUES ($1, $2, $3)")
                .bind(part.id)
                .bind(filename)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(part)
    }

    /// Update a part: fields are always replaced; characteristics are fully
    /// replaced; image rows are replaced only when `replace_images` is set.
    ///
    /// Returns the filenames of any replaced image rows so the caller can
    /// remove the files from disk (best-effort).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the part or category does not
    /// exist. Returns `RepositoryError::Database` for other errors.
    pub async fn update(
        &self,
        id: PartId,
        record: PartRecord,
        replace_images: bool,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE parts SET name = $1, price = $2, category_id = $3 WHERE id = $4")
            .bind(&record.name)
            .bind(record.price)
            .bind(record.category_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::NotFound;
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Characteristics are fully replaced; the old value rows go with
        // their links.
        let old_characteristic_ids: Vec<i32> = sqlx::query_scalar(
            "DELETE FROM part_characteristics WHERE part_id = $1 RETURNING characteristic_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !old_characteristic_ids.is_empty() {
            sqlx::query("DELETE FROM characteristics WHERE id = ANY($1)")
                .bind(&old_characteristic_ids)
                .execute(&mut *tx)
                .await?;
        }

        for (name_id, value) in &record.characteristics {
            let characteristic_id = sqlx::query_scalar::<_, i32>(
                "INSERT INTO characteristics (name_id, value) VALUES ($1, $2) RETURNING id",
            )
            .bind(name_id)
            .bind(value)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO part_characteristics (part_id, characteristic_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(characteristic_id)
            .execute(&mut *tx)
            .await?;
        }

        let mut removed = Vec::new();
        if replace_images {
            removed = sqlx::query_scalar::<_, String>(
                "DELETE FROM part_images WHERE part_id = $1 RETURNING filename",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            for (position, filename) in record.image_filenames.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO part_images (part_id, filename, position) VALUES ($1, $2, $3)",
                )
                .bind(id)
                .bind(filename)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Delete a part, its characteristics, and its image rows.
    ///
    /// Returns the filenames of the deleted image rows so the caller can
    /// remove the files from disk (best-effort).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any product's bill of materials
    /// references the part. Returns `RepositoryError::NotFound` if the part
    /// does not exist. Returns `RepositoryError::Database` for other errors.
    pub async fn delete(&self, id: PartId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM product_parts WHERE part_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(RepositoryError::Conflict(
                "You can't delete this part, existing products are built from it.".to_owned(),
            ));
        }

        let old_characteristic_ids: Vec<i32> = sqlx::query_scalar(
            "DELETE FROM part_characteristics WHERE part_id = $1 RETURNING characteristic_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !old_characteristic_ids.is_empty() {
            sqlx::query("DELETE FROM characteristics WHERE id = ANY($1)")
                .bind(&old_characteristic_ids)
                .execute(&mut *tx)
                .await?;
        }

        let filenames = sqlx::query_scalar::<_, String>(
            "DELETE FROM part_images WHERE part_id = $1 RETURNING filename",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(filenames)
    }

    /// Get a fully-materialized part.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: PartId) -> Result<Option<PartDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, PartWithCategory>(
            r"
            SELECT p.id, p.name, p.price, p.category_id, c.name AS category
            FROM parts p
            JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let ids = [id.as_i32()];
        let mut characteristics = characteristics_by_part(self.pool, &ids).await?;
        let mut images = images_by_part(self.pool, &ids).await?;

        Ok(Some(PartDetail {
            part: Part {
                id: row.id,
                name: row.name,
                price: row.price,
                category_id: row.category_id,
            },
            category: row.category,
            characteristics: characteristics.remove(&id).unwrap_or_default(),
            images: images.remove(&id).unwrap_or_default(),
        }))
    }

    /// List every category together with its fully-materialized parts, as
    /// served to the PC configurator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn categories_with_parts(&self) -> Result<Vec<CategoryParts>, RepositoryError> {
        let categories = self.list_categories().await?;

        let parts = sqlx::query_as::<_, PartWithCategory>(
            r"
            SELECT p.id, p.name, p.price, p.category_id, c.name AS category
            FROM parts p
            JOIN categories c ON c.id = p.category_id
            ORDER BY p.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = parts.iter().map(|p| p.id.as_i32()).collect();
        let mut characteristics = characteristics_by_part(self.pool, &ids).await?;
        let mut images = images_by_part(self.pool, &ids).await?;

        let mut by_category: HashMap<CategoryId, Vec<PartDetail>> = HashMap::new();
        for row in parts {
            let detail = PartDetail {
                part: Part {
                    id: row.id,
                    name: row.name,
                    price: row.price,
                    category_id: row.category_id,
                },
                category: row.category,
                characteristics: characteristics.remove(&row.id).unwrap_or_default(),
                images: images.remove(&row.id).unwrap_or_default(),
            };
            by_category.entry(row.category_id).or_default().push(detail);
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryParts {
                parts: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct PartWithCategory {
    id: PartId,
    name: String,
    price: Decimal,
    category_id: CategoryId,
    category: String,
}

/// Batch-load characteristics (with labels) for a set of parts.
async fn characteristics_by_part(
    pool: &PgPool,
    part_ids: &[i32],
) -> Result<HashMap<PartId, Vec<Characteristic>>, RepositoryError> {
    if part_ids.is_empty() {
        return Ok(HashMap::new());
    }

    #[derive(sqlx::FromRow)]
    struct Row {
        part_id: PartId,
        id: shoppy_core::CharacteristicId,
        name: String,
        value: String,
    }

    let rows = sqlx::query_as::<_, Row>(
        r"
        SELECT pc.part_id, ch.id, cn.name, ch.value
        FROM part_characteristics pc
        JOIN characteristics ch ON ch.id = pc.characteristic_id
        JOIN characteristic_names cn ON cn.id = ch.name_id
        WHERE pc.part_id = ANY($1)
        ORDER BY cn.name
        ",
    )
    .bind(part_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<PartId, Vec<Characteristic>> = HashMap::new();
    for row in rows {
        grouped.entry(row.part_id).or_default().push(Characteristic {
            id: row.id,
            name: row.name,
            value: row.value,
        });
    }
    Ok(grouped)
}

/// Batch-load images for a set of parts, grouped by owner.
async fn images_by_part(
    pool: &PgPool,
    part_ids: &[i32],
) -> Result<HashMap<PartId, Vec<PartImage>>, RepositoryError> {
    if part_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, PartImage>(
        r"
        SELECT id, part_id, filename, position
        FROM part_images
        WHERE part_id = ANY($1)
        ORDER BY part_id, position
        ",
    )
    .bind(part_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<PartId, Vec<PartImage>> = HashMap::new();
    for image in rows {
        grouped.entry(image.part_id).or_default().push(image);
    }
    Ok(grouped)
}
