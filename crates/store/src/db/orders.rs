//! Order repository: placement, listing, and terminal fulfillment.
//!
//! Placement and fulfillment are the two multi-step mutations in the system;
//! each runs inside a single transaction so the cart→order conversion and the
//! fulfillment cascade are all-or-nothing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shoppy_core::{Email, OrderId, ProductId, UserId};

use super::RepositoryError;
use crate::models::catalog::Product;
use crate::models::order::{Order, OrderDetail, OrderLineDetail};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the user's cart.
    ///
    /// Reads the cart, computes the total from live product prices, converts
    /// every cart line to an order line, and clears the cart - all in one
    /// transaction. Returns `None` (and writes nothing) if the cart is empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn place(
        &self,
        user_id: UserId,
        shipping_price: Decimal,
        phone_number: &str,
        address: &str,
        placed_at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let entries = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT cl.product_id, cl.quantity, p.price
            FROM cart_lines cl
            JOIN products p ON p.id = cl.product_id
            WHERE cl.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if entries.is_empty() {
            return Ok(None);
        }

        let total: Decimal = entries
            .iter()
            .map(|e| e.price * Decimal::from(e.quantity))
            .sum();

        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO orders (user_id, total_price, shipping_price, phone_number, address, placed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, total_price, shipping_price, phone_number, address, placed_at
            ",
        )
        .bind(user_id)
        .bind(total)
        .bind(shipping_price)
        .bind(phone_number)
        .bind(address)
        .bind(placed_at)
        .fetch_one(&mut *tx)
        .await?;

        for entry in &entries {
            sqlx::query(
                "INSERT INTO order_lines (order_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(order.id)
            .bind(entry.product_id)
            .bind(entry.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Get one fully-materialized order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut details = self
            .fetch_details("WHERE o.id = $1", Some(id), None)
            .await?;
        Ok(details.pop())
    }

    /// List orders, oldest first, optionally restricted to a half-open
    /// `[start, end)` time range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        match range {
            Some(range) => {
                self.fetch_details(
                    "WHERE o.placed_at >= $1 AND o.placed_at < $2",
                    None,
                    Some(range),
                )
                .await
            }
            None => self.fetch_details("", None, None).await,
        }
    }

    /// Fulfill (send or reject) an order: terminal state.
    ///
    /// In one transaction: deletes the order (guarding against concurrent
    /// fulfillment via the affected-row count), its order lines, and every
    /// made-by-user product referenced by those lines together with that
    /// product's image rows and any cart lines pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or was
    /// already fulfilled by a concurrent admin. Returns
    /// `RepositoryError::Database` for other database errors.
    pub async fn fulfill(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user_made_ids: Vec<i32> = sqlx::query_scalar(
            r"
            SELECT p.id
            FROM order_lines ol
            JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = $1 AND p.made_by_user = TRUE
            ",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // Deleting the order cascades to its order_lines. Zero rows affected
        // means another admin got here first.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if !user_made_ids.is_empty() {
            sqlx::query("DELETE FROM product_images WHERE product_id = ANY($1)")
                .bind(&user_made_ids)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM cart_lines WHERE product_id = ANY($1)")
                .bind(&user_made_ids)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM products WHERE id = ANY($1)")
                .bind(&user_made_ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Shared order-aggregate loader: orders (with owner email) matching the
    /// given predicate, then their lines and part names in two batch queries.
    async fn fetch_details(
        &self,
        predicate: &str,
        id: Option<OrderId>,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let sql = format!(
            r"
            SELECT o.id, o.user_id, o.total_price, o.shipping_price,
                   o.phone_number, o.address, o.placed_at, u.email
            FROM orders o
            JOIN users u ON u.id = o.user_id
            {predicate}
            ORDER BY o.placed_at
            ",
        );

        let mut query = sqlx::query_as::<_, OrderRow>(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        if let Some((start, end)) = range {
            query = query.bind(start).bind(end);
        }
        let orders = query.fetch_all(self.pool).await?;

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let mut lines = self.lines_for_orders(&order_ids).await?;

        Ok(orders
            .into_iter()
            .map(|row| OrderDetail {
                lines: lines.remove(&row.id).unwrap_or_default(),
                user_email: row.email,
                order: Order {
                    id: row.id,
                    user_id: row.user_id,
                    total_price: row.total_price,
                    shipping_price: row.shipping_price,
                    phone_number: row.phone_number,
                    address: row.address,
                    placed_at: row.placed_at,
                },
            })
            .collect())
    }

    /// Batch-load materialized order lines (product + part names) for a set
    /// of orders.
    async fn lines_for_orders(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<OrderId, Vec<OrderLineDetail>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT ol.order_id, ol.quantity,
                   p.id, p.name, p.price, p.description, p.made_by_user
            FROM order_lines ol
            JOIN products p ON p.id = ol.product_id
            WHERE ol.order_id = ANY($1)
            ORDER BY ol.order_id, p.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let product_ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut part_names = self.part_names_for_products(&product_ids).await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLineDetail>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.order_id)
                .or_default()
                .push(OrderLineDetail {
                    part_names: part_names.remove(&row.id).unwrap_or_default(),
                    product: Product {
                        id: row.id,
                        name: row.name,
                        price: row.price,
                        description: row.description,
                        made_by_user: row.made_by_user,
                    },
                    quantity: row.quantity,
                });
        }
        Ok(grouped)
    }

    /// Batch-load bill-of-materials part names for a set of products.
    async fn part_names_for_products(
        &self,
        product_ids: &[i32],
    ) -> Result<HashMap<ProductId, Vec<String>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(sqlx::FromRow)]
        struct Row {
            product_id: ProductId,
            name: String,
        }

        let rows = sqlx::query_as::<_, Row>(
            r"
            SELECT pp.product_id, p.name
            FROM product_parts pp
            JOIN parts p ON p.id = pp.part_id
            WHERE pp.product_id = ANY($1)
            ORDER BY pp.product_id, p.id
            ",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<ProductId, Vec<String>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row.name);
        }
        Ok(grouped)
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_price: Decimal,
    shipping_price: Decimal,
    phone_number: String,
    address: String,
    placed_at: DateTime<Utc>,
    email: Email,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    quantity: i32,
    id: ProductId,
    name: String,
    price: Decimal,
    description: Option<String>,
    made_by_user: bool,
}
