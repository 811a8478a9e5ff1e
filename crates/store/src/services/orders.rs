//! Cart and order service: add-to-cart, checkout, fulfillment, listing.
//!
//! Order state machine: `placed -> {sent, rejected}`. Both outcomes are
//! terminal - the repository deletes the record - and are followed by a
//! fire-and-forget notification to the order's owner.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use shoppy_core::{OrderId, ProductId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::countries::CountryRepository;
use crate::db::orders::OrderRepository;
use crate::models::catalog::Country;
use crate::models::order::{CartEntry, Order, OrderDetail, OrderResolution};
use crate::models::session::CurrentUser;
use crate::services::email::{self, Mailer};

/// Flat shipping surcharge for destinations outside the United States.
const INTERNATIONAL_SHIPPING: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// The one destination shipped free of charge.
const DOMESTIC_COUNTRY: &str = "United States";

/// Validated checkout form data.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub phone_number: String,
    pub address: String,
    pub country: String,
}

/// Errors from cart and order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout attempted with nothing in the cart.
    #[error("You don't have any products in your cart!")]
    EmptyCart,

    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// A date filter was not a valid `YYYY-MM-DD` pair.
    #[error("invalid date format")]
    InvalidDateRange,

    /// The order does not exist (or was already fulfilled).
    #[error("order not found")]
    NotFound,

    /// The product being added does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Notification body rendering failed.
    #[error("failed to render notification: {0}")]
    Render(#[from] askama::Error),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart and order service.
pub struct OrderService<'a> {
    cart: CartRepository<'a>,
    orders: OrderRepository<'a>,
    countries: CountryRepository<'a>,
    mailer: &'a Mailer,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a Mailer) -> Self {
        Self {
            cart: CartRepository::new(pool),
            orders: OrderRepository::new(pool),
            countries: CountryRepository::new(pool),
            mailer,
        }
    }

    /// The user's cart entries and live total.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the read fails.
    pub async fn cart(&self, user: &CurrentUser) -> Result<(Vec<CartEntry>, Decimal), OrderError> {
        let entries = self.cart.entries(user.id).await?;
        let total = cart_total(&entries);
        Ok((entries, total))
    }

    /// Add a product to the user's cart; repeated adds sum quantities.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidQuantity` for a non-positive quantity and
    /// `OrderError::ProductNotFound` if the product does not exist.
    pub async fn add_to_cart(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), OrderError> {
        if quantity < 1 {
            return Err(OrderError::InvalidQuantity);
        }

        self.cart
            .add(user.id, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::ProductNotFound,
                other => OrderError::Repository(other),
            })
    }

    /// Remove a product from the user's cart and return the new cart total.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn remove_from_cart(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
    ) -> Result<Decimal, OrderError> {
        self.cart.remove(user.id, product_id).await?;
        let entries = self.cart.entries(user.id).await?;
        Ok(cart_total(&entries))
    }

    /// Countries for the checkout selector.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the read fails.
    pub async fn countries(&self) -> Result<Vec<Country>, OrderError> {
        Ok(self.countries.list().await?)
    }

    /// Place an order from the user's cart.
    ///
    /// The total is computed from live product prices, the shipping surcharge
    /// from the destination country, and the cart→order conversion plus the
    /// cart clear happen in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if the user's cart has no lines.
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        input: CheckoutInput,
    ) -> Result<Order, OrderError> {
        let shipping = shipping_price(&input.country);
        let address = format!("{}, {}", input.country, input.address);

        self.orders
            .place(user.id, shipping, &input.phone_number, &address, Utc::now())
            .await?
            .ok_or(OrderError::EmptyCart)
    }

    /// List orders for the admin back-office, oldest first. When both bounds
    /// are given the listing is restricted to `[start, end + 1 day)`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidDateRange` if a bound fails to parse.
    pub async fn list_orders(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        let range = match (start_date, end_date) {
            (Some(start), Some(end)) => Some(parse_date_range(start, end)?),
            _ => None,
        };
        Ok(self.orders.list(range).await?)
    }

    /// Resolve an order: send or reject. Terminal either way.
    ///
    /// Renders the notification from the order's pre-deletion state, runs the
    /// fulfillment cascade in one transaction, and only then dispatches the
    /// notification fire-and-forget, so a mail failure can never roll back a
    /// completed fulfillment.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or a
    /// concurrent admin fulfilled it first.
    pub async fn fulfill(
        &self,
        order_id: OrderId,
        resolution: OrderResolution,
    ) -> Result<(), OrderError> {
        let detail = self
            .orders
            .get_detail(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let (subject, body) = email::render_resolution(&detail, resolution)?;

        self.orders.fulfill(order_id).await.map_err(|e| match e {
            RepositoryError::NotFound => OrderError::NotFound,
            other => OrderError::Repository(other),
        })?;

        self.mailer.dispatch(subject, body, detail.user_email);
        Ok(())
    }
}

/// Live cart total: sum of unit price times quantity over all entries.
#[must_use]
pub fn cart_total(entries: &[CartEntry]) -> Decimal {
    entries.iter().map(CartEntry::line_price).sum()
}

/// Shipping surcharge for a destination country.
#[must_use]
pub fn shipping_price(country: &str) -> Decimal {
    if country == DOMESTIC_COUNTRY {
        Decimal::ZERO
    } else {
        INTERNATIONAL_SHIPPING
    }
}

/// Parse an inclusive `YYYY-MM-DD` pair into the half-open UTC range
/// `[start, end + 1 day)`.
///
/// # Errors
///
/// Returns `OrderError::InvalidDateRange` if either bound fails to parse.
pub fn parse_date_range(
    start: &str,
    end: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), OrderError> {
    let start_day =
        NaiveDate::parse_from_str(start, "%Y-%m-%d").map_err(|_| OrderError::InvalidDateRange)?;
    let end_day =
        NaiveDate::parse_from_str(end, "%Y-%m-%d").map_err(|_| OrderError::InvalidDateRange)?;

    let end_day = end_day
        .checked_add_days(Days::new(1))
        .ok_or(OrderError::InvalidDateRange)?;

    Ok((
        start_day.and_time(NaiveTime::MIN).and_utc(),
        end_day.and_time(NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shoppy_core::ProductId;

    use crate::models::catalog::Product;

    use super::*;

    fn entry(price: &str, quantity: i32) -> CartEntry {
        CartEntry {
            product: Product {
                id: ProductId::new(1),
                name: "item".to_owned(),
                price: price.parse().unwrap(),
                description: None,
                made_by_user: false,
            },
            quantity,
        }
    }

    #[test]
    fn test_cart_total_sums_line_prices() {
        let entries = vec![entry("999.99", 1), entry("49.50", 3)];
        assert_eq!(cart_total(&entries), "1148.49".parse().unwrap());
    }

    #[test]
    fn test_cart_total_empty_is_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_shipping_free_for_united_states_only() {
        assert_eq!(shipping_price("United States"), Decimal::ZERO);
        assert_eq!(shipping_price("Canada"), Decimal::from(50));
        assert_eq!(shipping_price("united states"), Decimal::from(50));
    }

    #[test]
    fn test_date_range_is_half_open_on_next_day() {
        let (start, end) = parse_date_range("2024-03-01", "2024-03-05").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-06T00:00:00+00:00");
    }

    #[test]
    fn test_date_range_rejects_malformed_input() {
        assert!(matches!(
            parse_date_range("03/01/2024", "2024-03-05"),
            Err(OrderError::InvalidDateRange)
        ));
        assert!(matches!(
            parse_date_range("2024-03-01", "not-a-date"),
            Err(OrderError::InvalidDateRange)
        ));
    }
}
