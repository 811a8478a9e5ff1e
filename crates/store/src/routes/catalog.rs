//! Catalog route handlers: product listing, detail, PC configurator.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::catalog::{CategoryParts, Product, ProductDetail, ProductSummary};
use crate::services::catalog::{CatalogService, UserBuildInput};
use crate::state::AppState;

/// Product detail response: the aggregate plus the selection tokens the
/// configurator form round-trips on update.
#[derive(Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub detail: ProductDetail,
    pub part_tokens: String,
}

/// Form data for composing a PC from selected parts.
#[derive(Debug, Deserialize)]
pub struct BuildForm {
    pub price: Decimal,
    /// `<category>_<part-id>` tokens separated by `;`.
    pub selected_parts: String,
    pub quantity: i32,
}

/// Catalog listing: admin-catalogued products with images.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductSummary>>> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    Ok(Json(catalog.list_products().await?))
}

/// Product detail with images and bill of materials.
#[instrument(skip_all, fields(product_id = id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductDetailResponse>> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    let detail = catalog.product_detail(ProductId::new(id)).await?;

    Ok(Json(ProductDetailResponse {
        part_tokens: detail.part_tokens(),
        detail,
    }))
}

/// Categories with parts for the PC configurator. Login required.
#[instrument(skip_all)]
pub async fn build_options(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryParts>>> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    Ok(Json(catalog.configurator_options().await?))
}

/// Compose a PC from selected parts and add it to the user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_build(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Form(form): Form<BuildForm>,
) -> Result<(StatusCode, Json<Product>)> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    let product = catalog
        .create_user_build(
            &user,
            UserBuildInput {
                price: form.price,
                part_tokens: form.selected_parts,
                quantity: form.quantity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}
