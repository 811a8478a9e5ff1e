//! Order notification dispatch.
//!
//! Uses SMTP via lettre for delivery with Askama plain-text templates. The
//! transport is built once at startup and reused; per-order sends are
//! fire-and-forget tasks so fulfillment latency is never coupled to the mail
//! relay's round-trip time. No retry, no delivery confirmation - at most one
//! attempt per notification.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use shoppy_core::Email;

use crate::config::SmtpConfig;
use crate::models::order::{OrderDetail, OrderResolution};

/// Plain text template for the "order sent" notification.
#[derive(Template)]
#[template(path = "email/order_sent.txt")]
struct OrderSentEmail<'a> {
    order: &'a OrderEmailView,
}

/// Plain text template for the "order rejected" notification.
#[derive(Template)]
#[template(path = "email/order_rejected.txt")]
struct OrderRejectedEmail<'a> {
    order: &'a OrderEmailView,
}

/// Display-ready order data for the email templates.
pub struct OrderEmailView {
    pub phone_number: String,
    pub address: String,
    pub date: String,
    pub shipping_price: String,
    pub total_price: String,
    pub lines: Vec<OrderEmailLine>,
}

/// One ordered product as rendered in the email body.
pub struct OrderEmailLine {
    pub name: String,
    pub parts: String,
    pub quantity: i32,
    pub price: String,
}

impl OrderEmailView {
    /// Build the display view from a materialized order.
    #[must_use]
    pub fn from_detail(detail: &OrderDetail) -> Self {
        Self {
            phone_number: detail.order.phone_number.clone(),
            address: detail.order.address.clone(),
            date: detail.order.placed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            shipping_price: detail.order.shipping_price.to_string(),
            total_price: detail.order.total_price.to_string(),
            lines: detail
                .lines
                .iter()
                .map(|line| OrderEmailLine {
                    name: line.product.name.clone(),
                    parts: line.part_names.join("; "),
                    quantity: line.quantity,
                    price: line.line_price().to_string(),
                })
                .collect(),
        }
    }
}

/// Render the subject and body for an order resolution notification.
///
/// # Errors
///
/// Returns `askama::Error` if template rendering fails.
pub fn render_resolution(
    detail: &OrderDetail,
    resolution: OrderResolution,
) -> Result<(&'static str, String), askama::Error> {
    let order = OrderEmailView::from_detail(detail);
    match resolution {
        OrderResolution::Sent => Ok(("Order sent", OrderSentEmail { order: &order }.render()?)),
        OrderResolution::Rejected => Ok((
            "Order rejected",
            OrderRejectedEmail { order: &order }.render()?,
        )),
    }
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid sender or recipient address.
    #[error("invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
}

/// Outbound mail dispatcher.
///
/// Holds one SMTP transport for the life of the process. Failure to build
/// the relay at construction is fatal to the instance.
#[derive(Clone)]
pub struct Mailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the STARTTLS relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a plain-text message and wait for the relay's response.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or the relay refuses it.
    pub async fn send(&self, subject: &str, body: String, to: &Email) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.as_str().parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(message).await?;
        Ok(())
    }

    /// Dispatch a message off the request path: spawn the send and return
    /// immediately. Failures are logged, never surfaced to the caller.
    pub fn dispatch(&self, subject: &'static str, body: String, to: Email) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(subject, body, &to).await {
                tracing::warn!(recipient = %to, error = %e, "order notification failed");
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use shoppy_core::{OrderId, ProductId, UserId};

    use crate::models::catalog::Product;
    use crate::models::order::{Order, OrderLineDetail};

    use super::*;

    fn sample_detail() -> OrderDetail {
        OrderDetail {
            order: Order {
                id: OrderId::new(1),
                user_id: UserId::new(2),
                total_price: Decimal::new(120_050, 2),
                shipping_price: Decimal::from(50),
                phone_number: "+1 555 0100".to_owned(),
                address: "Canada, 12 Main St".to_owned(),
                placed_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap(),
            },
            user_email: Email::parse("buyer@example.com").unwrap(),
            lines: vec![OrderLineDetail {
                product: Product {
                    id: ProductId::new(3),
                    name: "Your PC".to_owned(),
                    price: Decimal::new(60_025, 2),
                    description: None,
                    made_by_user: true,
                },
                part_names: vec!["Ryzen 5".to_owned(), "16GB DDR5".to_owned()],
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_sent_body_contains_order_details() {
        let (subject, body) = render_resolution(&sample_detail(), OrderResolution::Sent).unwrap();

        assert_eq!(subject, "Order sent");
        assert!(body.contains("Your order has just been sent!"));
        assert!(body.contains("Stated phone number: +1 555 0100"));
        assert!(body.contains("Stated address: Canada, 12 Main St"));
        assert!(body.contains("Date of order: 2024-03-05 14:30:00"));
        assert!(body.contains("Shipping price: 50$"));
        assert!(body.contains("Total price: 1200.50$"));
        assert!(body.contains("Your PC(Ryzen 5; 16GB DDR5), Quantity: 2, price: 1200.50$;"));
    }

    #[test]
    fn test_rejected_body_has_cancellation_notice() {
        let (subject, body) =
            render_resolution(&sample_detail(), OrderResolution::Rejected).unwrap();

        assert_eq!(subject, "Order rejected");
        assert!(body.contains("has been cancelled"));
        assert!(body.contains("ORDER DETAILS:"));
    }
}
