//! Catalog service: product and part CRUD, image attachment, PC composition.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use shoppy_core::{CategoryId, PartId, ProductId};

use crate::db::RepositoryError;
use crate::db::parts::{PartRecord, PartRepository};
use crate::db::products::{ProductRecord, ProductRepository};
use crate::models::catalog::{
    CategoryParts, CharacteristicName, Part, PartDetail, Product, ProductDetail, ProductSummary,
};
use crate::models::session::CurrentUser;
use crate::services::images::ImageStore;

/// Fixed name for user-composed products.
const USER_BUILD_NAME: &str = "Your PC";

/// Stock image row attached to every user build. The file ships with the
/// static assets, so it is never written or removed per product.
const USER_BUILD_IMAGE: &str = "user-made-pc.jpg";

/// An uploaded image: the client-supplied filename and the raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Validated form data for creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    /// `<category>_<part-id>` tokens separated by `;`.
    pub part_tokens: String,
    pub images: Vec<UploadedImage>,
}

/// Validated form data for creating a part.
#[derive(Debug, Clone)]
pub struct PartInput {
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
    /// (label, value) pairs; labels must exist in the characteristic catalog.
    pub characteristics: Vec<(String, String)>,
    pub images: Vec<UploadedImage>,
}

/// Validated form data for a user-composed PC.
#[derive(Debug, Clone)]
pub struct UserBuildInput {
    pub price: Decimal,
    pub part_tokens: String,
    pub quantity: i32,
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A `<category>_<part-id>` token did not end in a numeric id.
    #[error("invalid part token: {0}")]
    InvalidPartToken(String),

    /// A characteristic label is not in the catalog.
    #[error("unknown characteristic: {0}")]
    UnknownCharacteristic(String),

    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The requested product or part does not exist.
    #[error("not found")]
    NotFound,

    /// Image bytes could not be written to storage.
    #[error("image storage failed: {0}")]
    ImageStore(#[from] std::io::Error),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Catalog service over products, parts, and their image stores.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    parts: PartRepository<'a>,
    product_images: &'a ImageStore,
    part_images: &'a ImageStore,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        product_images: &'a ImageStore,
        part_images: &'a ImageStore,
    ) -> Self {
        Self {
            products: ProductRepository::new(pool),
            parts: PartRepository::new(pool),
            product_images,
            part_images,
        }
    }

    /// List the admin-catalogued products with images.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the read fails.
    pub async fn list_products(&self) -> Result<Vec<ProductSummary>, CatalogError> {
        Ok(self.products.list_catalog().await?)
    }

    /// Fetch a fully-materialized product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no such product exists.
    pub async fn product_detail(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        self.products
            .get_detail(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Categories with their parts, for the PC configurator.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the read fails.
    pub async fn configurator_options(&self) -> Result<Vec<CategoryParts>, CatalogError> {
        Ok(self.parts.categories_with_parts().await?)
    }

    /// The characteristic label catalog, for the admin part form.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the read fails.
    pub async fn characteristic_names(&self) -> Result<Vec<CharacteristicName>, CatalogError> {
        Ok(self.parts.list_characteristic_names().await?)
    }

    /// Create an admin-catalogued product: store its images (collision-safe)
    /// and persist the record with its bill of materials.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidPartToken` on a malformed token,
    /// `CatalogError::NotFound` if a part id is unknown, and
    /// `CatalogError::ImageStore` if the upload cannot be written.
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let part_ids = parse_part_tokens(&input.part_tokens)?;
        let filenames = self.store_uploads(self.product_images, &input.images)?;

        let result = self
            .products
            .create(ProductRecord {
                name: input.name,
                price: input.price,
                description: input.description,
                made_by_user: false,
                part_ids,
                image_filenames: filenames.clone(),
            })
            .await;

        match result {
            Ok(product) => Ok(product),
            Err(e) => {
                // The record never landed; don't leave orphan files behind.
                for filename in &filenames {
                    self.product_images.remove(filename);
                }
                Err(e.into())
            }
        }
    }

    /// Update a product. The parts list is fully replaced; when new images
    /// are uploaded the old ones are removed (rows and, best-effort, files).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product or a part id is
    /// unknown, `CatalogError::InvalidPartToken` on a malformed token, and
    /// `CatalogError::ImageStore` if an upload cannot be written.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<(), CatalogError> {
        let part_ids = parse_part_tokens(&input.part_tokens)?;
        let replace_images = !input.images.is_empty();
        let filenames = self.store_uploads(self.product_images, &input.images)?;

        let result = self
            .products
            .update(
                id,
                ProductRecord {
                    name: input.name,
                    price: input.price,
                    description: input.description,
                    made_by_user: false,
                    part_ids,
                    image_filenames: filenames.clone(),
                },
                replace_images,
            )
            .await;

        match result {
            Ok(removed) => {
                for filename in &removed {
                    self.product_images.remove(filename);
                }
                Ok(())
            }
            Err(RepositoryError::NotFound) => {
                for filename in &filenames {
                    self.product_images.remove(filename);
                }
                Err(CatalogError::NotFound)
            }
            Err(e) => {
                for filename in &filenames {
                    self.product_images.remove(filename);
                }
                Err(e.into())
            }
        }
    }

    /// Delete a product unless an order line references it; cascades its
    /// cart lines, image rows, and (best-effort) image files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` (via `Repository`) while any order
    /// references the product, and `CatalogError::NotFound` if it does not
    /// exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let filenames = self.products.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound,
            other => CatalogError::Repository(other),
        })?;

        for filename in &filenames {
            self.product_images.remove(filename);
        }
        Ok(())
    }

    /// Compose a product from the user's selected parts and put it straight
    /// into their cart.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidQuantity` for a non-positive quantity,
    /// `CatalogError::InvalidPartToken` on a malformed token, and
    /// `CatalogError::NotFound` if a part id is unknown.
    pub async fn create_user_build(
        &self,
        user: &CurrentUser,
        input: UserBuildInput,
    ) -> Result<Product, CatalogError> {
        if input.quantity < 1 {
            return Err(CatalogError::InvalidQuantity);
        }
        let part_ids = parse_part_tokens(&input.part_tokens)?;

        let product = self
            .products
            .create_user_build(
                user.id,
                ProductRecord {
                    name: USER_BUILD_NAME.to_owned(),
                    price: input.price,
                    description: None,
                    made_by_user: true,
                    part_ids,
                    image_filenames: vec![USER_BUILD_IMAGE.to_owned()],
                },
                input.quantity,
            )
            .await?;

        Ok(product)
    }

    /// Create a part with characteristics and images.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownCharacteristic` if a label is not in the
    /// catalog, `CatalogError::NotFound` if the category is unknown, and
    /// `CatalogError::ImageStore` if an upload cannot be written.
    pub async fn create_part(&self, input: PartInput) -> Result<Part, CatalogError> {
        let mut characteristics = Vec::with_capacity(input.characteristics.len());
        for (label, value) in input.characteristics {
            let name_id = self
                .parts
                .resolve_characteristic_name(&label)
                .await?
                .ok_or_else(|| CatalogError::UnknownCharacteristic(label.clone()))?;
            characteristics.push((name_id, value));
        }

        let filenames = self.store_uploads(self.part_images, &input.images)?;

        let result = self
            .parts
            .create(PartRecord {
                name: input.name,
                price: input.price,
                category_id: input.category_id,
                characteristics,
                image_filenames: filenames.clone(),
            })
            .await;

        match result {
            Ok(part) => Ok(part),
            Err(e) => {
                for filename in &filenames {
                    self.part_images.remove(filename);
                }
                Err(match e {
                    RepositoryError::NotFound => CatalogError::NotFound,
                    other => CatalogError::Repository(other),
                })
            }
        }
    }

    /// Fetch a fully-materialized part.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no such part exists.
    pub async fn part_detail(&self, id: PartId) -> Result<PartDetail, CatalogError> {
        self.parts
            .get_detail(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Update a part. Characteristics are fully replaced; images are
    /// replaced (rows and, best-effort, files) only when new ones are
    /// uploaded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownCharacteristic` if a label is not in the
    /// catalog and `CatalogError::NotFound` if the part or category is
    /// unknown.
    pub async fn update_part(&self, id: PartId, input: PartInput) -> Result<(), CatalogError> {
        let mut characteristics = Vec::with_capacity(input.characteristics.len());
        for (label, value) in input.characteristics {
            let name_id = self
                .parts
                .resolve_characteristic_name(&label)
                .await?
                .ok_or_else(|| CatalogError::UnknownCharacteristic(label.clone()))?;
            characteristics.push((name_id, value));
        }

        let replace_images = !input.images.is_empty();
        let filenames = self.store_uploads(self.part_images, &input.images)?;

        let result = self
            .parts
            .update(
                id,
                PartRecord {
                    name: input.name,
                    price: input.price,
                    category_id: input.category_id,
                    characteristics,
                    image_filenames: filenames.clone(),
                },
                replace_images,
            )
            .await;

        match result {
            Ok(removed) => {
                for filename in &removed {
                    self.part_images.remove(filename);
                }
                Ok(())
            }
            Err(e) => {
                for filename in &filenames {
                    self.part_images.remove(filename);
                }
                Err(match e {
                    RepositoryError::NotFound => CatalogError::NotFound,
                    other => CatalogError::Repository(other),
                })
            }
        }
    }

    /// Delete a part unless a product's bill of materials references it;
    /// cascades its characteristics, image rows, and (best-effort) image
    /// files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` (via `Repository`) while any
    /// product is built from the part, and `CatalogError::NotFound` if it
    /// does not exist.
    pub async fn delete_part(&self, id: PartId) -> Result<(), CatalogError> {
        let filenames = self.parts.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound,
            other => CatalogError::Repository(other),
        })?;

        for filename in &filenames {
            self.part_images.remove(filename);
        }
        Ok(())
    }

    /// Write uploads to an image store, returning the collision-resolved
    /// filenames in upload order.
    fn store_uploads(
        &self,
        store: &ImageStore,
        images: &[UploadedImage],
    ) -> Result<Vec<String>, CatalogError> {
        let mut filenames = Vec::with_capacity(images.len());
        for image in images {
            filenames.push(store.save(&image.filename, &image.bytes)?);
        }
        Ok(filenames)
    }
}

/// Parse `<category>_<part-id>` tokens separated by `;` into part ids.
///
/// The category label is display-only; the id is whatever follows the last
/// `_`. Duplicates collapse. Empty input (or stray empty tokens from a
/// trailing separator) parses to an empty selection.
///
/// # Errors
///
/// Returns `CatalogError::InvalidPartToken` if a token's tail is not numeric.
pub fn parse_part_tokens(tokens: &str) -> Result<Vec<PartId>, CatalogError> {
    let mut ids = Vec::new();
    for token in tokens.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let tail = token.rsplit('_').next().unwrap_or(token);
        let id: i32 = tail
            .parse()
            .map_err(|_| CatalogError::InvalidPartToken(token.to_owned()))?;
        ids.push(PartId::new(id));
    }

    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens_takes_id_after_last_separator() {
        let ids = parse_part_tokens("CPU_12;Harddrive_7;RAM_sticks_31").unwrap();
        assert_eq!(
            ids,
            vec![PartId::new(7), PartId::new(12), PartId::new(31)]
        );
    }

    #[test]
    fn test_parse_tokens_empty_selection() {
        assert!(parse_part_tokens("").unwrap().is_empty());
        assert!(parse_part_tokens(" ; ;").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tokens_dedups() {
        let ids = parse_part_tokens("CPU_5;GPU_5").unwrap();
        assert_eq!(ids, vec![PartId::new(5)]);
    }

    #[test]
    fn test_parse_tokens_rejects_non_numeric_tail() {
        assert!(matches!(
            parse_part_tokens("CPU_twelve"),
            Err(CatalogError::InvalidPartToken(_))
        ));
        assert!(matches!(
            parse_part_tokens("justlabel"),
            Err(CatalogError::InvalidPartToken(_))
        ));
    }
}
