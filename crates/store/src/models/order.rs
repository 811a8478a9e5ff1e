//! Cart and order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use shoppy_core::{Email, OrderId, ProductId, UserId};

use crate::models::catalog::Product;

/// A pending, unconfirmed purchase intent linking a user to a product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A cart line materialized with its product for display and checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartEntry {
    pub product: Product,
    pub quantity: i32,
}

impl CartEntry {
    /// Live line price: unit price times quantity.
    #[must_use]
    pub fn line_price(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// A placed order. Terminal: fulfillment (send or reject) deletes the record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Decimal,
    pub shipping_price: Decimal,
    pub phone_number: String,
    pub address: String,
    pub placed_at: DateTime<Utc>,
}

/// A confirmed purchase record linking an order to a product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// An order line materialized with its product and the product's part names.
///
/// Prices here are read live from the product row, not frozen at order time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineDetail {
    pub product: Product,
    pub part_names: Vec<String>,
    pub quantity: i32,
}

impl OrderLineDetail {
    /// Live line price: unit price times quantity.
    #[must_use]
    pub fn line_price(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// A fully-materialized order aggregate: owner email and all lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub user_email: Email,
    pub lines: Vec<OrderLineDetail>,
}

/// How an admin resolved an order. Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderResolution {
    /// The order was shipped.
    Sent,
    /// The order was flagged and cancelled.
    Rejected,
}
