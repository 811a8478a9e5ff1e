//! Cart and checkout route handlers.

use axum::{Form, Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::catalog::Country;
use crate::models::order::{CartEntry, Order};
use crate::services::orders::{CheckoutInput, OrderService};
use crate::state::AppState;

/// Cart contents with the live total.
#[derive(Serialize)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub total: Decimal,
}

/// Cart total after a mutation.
#[derive(Serialize)]
pub struct CartTotal {
    pub total: Decimal,
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: i32,
}

/// Remove-from-cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub phone_number: String,
    pub address: String,
    pub country: String,
}

/// The current user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<CartView>> {
    let orders = OrderService::new(state.pool(), state.mailer());
    let (entries, total) = orders.cart(&user).await?;
    Ok(Json(CartView { entries, total }))
}

/// Add a product to the cart. Repeated adds for the same product sum their
/// quantities.
#[instrument(skip_all, fields(user_id = %user.id, product_id = form.product_id))]
pub async fn add(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Form(form): Form<AddToCartForm>,
) -> Result<StatusCode> {
    let orders = OrderService::new(state.pool(), state.mailer());
    orders
        .add_to_cart(&user, ProductId::new(form.product_id), form.quantity)
        .await?;
    Ok(StatusCode::CREATED)
}

/// Remove a product from the cart and return the recomputed total.
#[instrument(skip_all, fields(user_id = %user.id, product_id = form.product_id))]
pub async fn remove(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartTotal>> {
    let orders = OrderService::new(state.pool(), state.mailer());
    let total = orders
        .remove_from_cart(&user, ProductId::new(form.product_id))
        .await?;
    Ok(Json(CartTotal { total }))
}

/// Countries for the checkout selector.
#[instrument(skip_all)]
pub async fn countries(State(state): State<AppState>) -> Result<Json<Vec<Country>>> {
    let orders = OrderService::new(state.pool(), state.mailer());
    Ok(Json(orders.countries().await?))
}

/// Place an order from the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Form(form): Form<CheckoutForm>,
) -> Result<(StatusCode, Json<Order>)> {
    let orders = OrderService::new(state.pool(), state.mailer());
    let order = orders
        .checkout(
            &user,
            CheckoutInput {
                phone_number: form.phone_number,
                address: form.address,
                country: form.country,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}
