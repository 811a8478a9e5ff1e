//! Catalog domain types: products, parts, categories, characteristics, images.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use shoppy_core::{
    CategoryId, CharacteristicId, CharacteristicNameId, PartId, PartImageId, ProductId,
    ProductImageId,
};

/// A sellable product: either admin-catalogued or composed by a user from
/// parts ("made by user").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub made_by_user: bool,
}

/// An image attached to a product, ordered by `position`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub filename: String,
    pub position: i32,
}

/// An image attached to a part, ordered by `position`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PartImage {
    pub id: PartImageId,
    pub part_id: PartId,
    pub filename: String,
    pub position: i32,
}

/// A part category (CPU, RAM, ...). Owns parts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A component that can be combined with others into a composed product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
}

/// A catalog entry for a characteristic label (e.g. "RAM capacity").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CharacteristicName {
    pub id: CharacteristicNameId,
    pub name: String,
}

/// A named attribute/value pair describing a part, with the label already
/// joined in (e.g. "RAM capacity" / "16GB").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Characteristic {
    pub id: CharacteristicId,
    pub name: String,
    pub value: String,
}

/// A part with everything needed to render it: category, characteristics,
/// images.
#[derive(Debug, Clone, Serialize)]
pub struct PartDetail {
    #[serde(flatten)]
    pub part: Part,
    pub category: String,
    pub characteristics: Vec<Characteristic>,
    pub images: Vec<PartImage>,
}

/// A catalog listing entry: product plus its ordered images.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

/// A part reference inside a product's bill of materials.
///
/// Carries the category name so the web layer can render the
/// `<category>_<part-id>` selection tokens.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PartRef {
    pub id: PartId,
    pub name: String,
    pub category: String,
}

/// A fully-materialized product aggregate: images and bill of materials.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub parts: Vec<PartRef>,
}

impl ProductDetail {
    /// Render the product's parts as `<category>_<part-id>` tokens, the shape
    /// the configurator form submits. Spaces are stripped from labels.
    #[must_use]
    pub fn part_tokens(&self) -> String {
        self.parts
            .iter()
            .map(|p| format!("{}_{}", p.category, p.id).replace(' ', ""))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// A category with its parts, as served to the PC configurator.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryParts {
    #[serde(flatten)]
    pub category: Category,
    pub parts: Vec<PartDetail>,
}

/// Checkout country selector entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Country {
    pub code: String,
    pub name: String,
}
