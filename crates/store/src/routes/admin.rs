//! Admin back-office route handlers: product/part CRUD, order review,
//! fulfillment, report export.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::{CategoryId, OrderId, PartId, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{Category, CharacteristicName, Part, PartDetail, Product};
use crate::models::order::{OrderDetail, OrderResolution};
use crate::services::catalog::{CatalogService, PartInput, ProductInput, UploadedImage};
use crate::services::orders::OrderService;
use crate::services::report;
use crate::state::AppState;

/// Optional inclusive date-range filter, `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Reference data for the admin part form.
#[derive(Serialize)]
pub struct PartOptions {
    pub categories: Vec<Category>,
    pub characteristic_names: Vec<CharacteristicName>,
}

/// Create a product from a multipart form.
///
/// Fields: `name`, `price`, `description`, `selected_parts`
/// (`<category>_<part-id>` tokens separated by `;`), repeated `images` files.
#[instrument(skip_all)]
pub async fn create_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let input = read_product_form(multipart).await?;
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    let product = catalog.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product from a multipart form. The parts list is fully replaced;
/// images are replaced only when new files are uploaded.
#[instrument(skip_all, fields(product_id = id))]
pub async fn update_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<StatusCode> {
    let input = read_product_form(multipart).await?;
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    catalog.update_product(ProductId::new(id), input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a product. Conflicts while any order line references it.
#[instrument(skip_all, fields(product_id = id))]
pub async fn delete_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    catalog.delete_product(ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Categories and characteristic labels for the part form.
#[instrument(skip_all)]
pub async fn part_options(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<PartOptions>> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    let options = catalog.configurator_options().await?;
    let characteristic_names = catalog.characteristic_names().await?;

    Ok(Json(PartOptions {
        categories: options.into_iter().map(|cp| cp.category).collect(),
        characteristic_names,
    }))
}

/// Create a part from a multipart form.
///
/// Fields: `name`, `price`, `category_id`, paired `c_name[]`/`c_value[]`
/// characteristic entries, repeated `images` files.
#[instrument(skip_all)]
pub async fn create_part(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Part>)> {
    let input = read_part_form(multipart).await?;
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    let part = catalog.create_part(input).await?;
    Ok((StatusCode::CREATED, Json(part)))
}

/// Part detail with category, characteristics, and images.
#[instrument(skip_all, fields(part_id = id))]
pub async fn show_part(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PartDetail>> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    Ok(Json(catalog.part_detail(PartId::new(id)).await?))
}

/// Update a part from a multipart form. Characteristics are fully replaced;
/// images are replaced only when new files are uploaded.
#[instrument(skip_all, fields(part_id = id))]
pub async fn update_part(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<StatusCode> {
    let input = read_part_form(multipart).await?;
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    catalog.update_part(PartId::new(id), input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a part. Conflicts while any product is built from it.
#[instrument(skip_all, fields(part_id = id))]
pub async fn delete_part(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let catalog = CatalogService::new(state.pool(), state.product_images(), state.part_images());
    catalog.delete_part(PartId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List orders awaiting fulfillment, optionally filtered by date range.
#[instrument(skip_all)]
pub async fn orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = OrderService::new(state.pool(), state.mailer());
    let listed = orders
        .list_orders(query.start_date.as_deref(), query.end_date.as_deref())
        .await?;
    Ok(Json(listed))
}

/// Mark an order as sent: cascade-delete it and notify the owner.
#[instrument(skip_all, fields(order_id = id))]
pub async fn send_order(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let orders = OrderService::new(state.pool(), state.mailer());
    orders
        .fulfill(OrderId::new(id), OrderResolution::Sent)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject an order: cascade-delete it and notify the owner.
#[instrument(skip_all, fields(order_id = id))]
pub async fn reject_order(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let orders = OrderService::new(state.pool(), state.mailer());
    orders
        .fulfill(OrderId::new(id), OrderResolution::Rejected)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stream the order report as a downloadable xlsx attachment.
#[instrument(skip_all)]
pub async fn report(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<impl IntoResponse> {
    let orders = OrderService::new(state.pool(), state.mailer());
    let listed = orders
        .list_orders(query.start_date.as_deref(), query.end_date.as_deref())
        .await?;

    let bytes = report::build_report(&listed)?;

    Ok((
        [
            (header::CONTENT_TYPE, report::REPORT_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"Report.xlsx\"",
            ),
        ],
        bytes,
    ))
}

// =============================================================================
// Multipart form readers
// =============================================================================

/// Read the product create/update multipart form.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductInput> {
    let mut name = None;
    let mut price = None;
    let mut description = None;
    let mut selected_parts = String::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(field_name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "price" => price = Some(parse_price(&field.text().await?)?),
            "description" => {
                let text = field.text().await?;
                if !text.is_empty() {
                    description = Some(text);
                }
            }
            "selected_parts" => selected_parts = field.text().await?,
            "images" => {
                if let Some(image) = read_image(field).await? {
                    images.push(image);
                }
            }
            _ => {}
        }
    }

    Ok(ProductInput {
        name: name.ok_or_else(|| missing_field("name"))?,
        price: price.ok_or_else(|| missing_field("price"))?,
        description,
        part_tokens: selected_parts,
        images,
    })
}

/// Read the part create multipart form.
async fn read_part_form(mut multipart: Multipart) -> Result<PartInput> {
    let mut name = None;
    let mut price = None;
    let mut category_id = None;
    let mut c_names = Vec::new();
    let mut c_values = Vec::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(field_name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "price" => price = Some(parse_price(&field.text().await?)?),
            "category_id" => {
                let text = field.text().await?;
                let id: i32 = text.parse().map_err(|_| {
                    AppError::Validation(format!("invalid category id: {text}"))
                })?;
                category_id = Some(CategoryId::new(id));
            }
            "c_name[]" => c_names.push(field.text().await?),
            "c_value[]" => c_values.push(field.text().await?),
            "images" => {
                if let Some(image) = read_image(field).await? {
                    images.push(image);
                }
            }
            _ => {}
        }
    }

    if c_names.len() != c_values.len() {
        return Err(AppError::Validation(
            "characteristic names and values must pair up".to_owned(),
        ));
    }

    Ok(PartInput {
        name: name.ok_or_else(|| missing_field("name"))?,
        price: price.ok_or_else(|| missing_field("price"))?,
        category_id: category_id.ok_or_else(|| missing_field("category_id"))?,
        characteristics: c_names.into_iter().zip(c_values).collect(),
        images,
    })
}

/// Read one uploaded image field. Empty file inputs are skipped.
async fn read_image(field: axum::extract::multipart::Field<'_>) -> Result<Option<UploadedImage>> {
    let Some(filename) = field.file_name().map(str::to_owned) else {
        return Ok(None);
    };
    if filename.is_empty() {
        return Ok(None);
    }

    let bytes = field.bytes().await?;
    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(UploadedImage {
        filename,
        bytes: bytes.to_vec(),
    }))
}

/// Parse a decimal price field.
fn parse_price(text: &str) -> Result<Decimal> {
    text.parse()
        .map_err(|_| AppError::Validation(format!("invalid price: {text}")))
}

/// Error for a missing required form field.
fn missing_field(name: &str) -> AppError {
    AppError::Validation(format!("missing form field: {name}"))
}
