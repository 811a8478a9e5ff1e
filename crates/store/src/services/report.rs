//! Order report export.
//!
//! Builds an xlsx workbook in memory, one row per order line, and hands the
//! bytes back for streaming as a download. Nothing is persisted. Unit prices
//! are read live from the product rows, the same staleness trade-off the rest
//! of the system makes.

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::models::order::OrderDetail;

/// Download filename for the generated report.
pub const REPORT_FILENAME: &str = "Report.xlsx";

/// MIME type for Office Open XML spreadsheets.
pub const REPORT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Column headers, in output order.
const COLUMNS: [&str; 9] = [
    "Email",
    "Phone Number",
    "Address",
    "Date",
    "Total Price",
    "Shipping Price",
    "Product",
    "Product price",
    "Quantity",
];

/// Build the xlsx report for the given orders.
///
/// # Errors
///
/// Returns `XlsxError` if the workbook cannot be assembled.
pub fn build_report(orders: &[OrderDetail]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (column, name) in COLUMNS.iter().enumerate() {
        worksheet.write(0, column as u16, *name)?;
    }

    let mut row: u32 = 1;
    for order in orders {
        for line in &order.lines {
            let product = if line.part_names.is_empty() {
                line.product.name.clone()
            } else {
                format!("{}({})", line.product.name, line.part_names.join("; "))
            };

            worksheet.write(row, 0, order.user_email.as_str())?;
            worksheet.write(row, 1, order.order.phone_number.as_str())?;
            worksheet.write(row, 2, order.order.address.as_str())?;
            worksheet.write(
                row,
                3,
                order
                    .order
                    .placed_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            )?;
            worksheet.write(row, 4, order.order.total_price.to_f64().unwrap_or_default())?;
            worksheet.write(
                row,
                5,
                order.order.shipping_price.to_f64().unwrap_or_default(),
            )?;
            worksheet.write(row, 6, product)?;
            worksheet.write(row, 7, line.product.price.to_f64().unwrap_or_default())?;
            worksheet.write(row, 8, line.quantity)?;
            row += 1;
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use shoppy_core::{Email, OrderId, ProductId, UserId};

    use crate::models::catalog::Product;
    use crate::models::order::{Order, OrderLineDetail};

    use super::*;

    fn detail_with_lines(lines: usize) -> OrderDetail {
        OrderDetail {
            order: Order {
                id: OrderId::new(1),
                user_id: UserId::new(1),
                total_price: Decimal::from(100),
                shipping_price: Decimal::ZERO,
                phone_number: "+1 555 0100".to_owned(),
                address: "United States, 1 Elm St".to_owned(),
                placed_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
            },
            user_email: Email::parse("buyer@example.com").unwrap(),
            lines: (0..lines)
                .map(|i| OrderLineDetail {
                    product: Product {
                        id: ProductId::new(i as i32 + 1),
                        name: format!("Product {i}"),
                        price: Decimal::from(25),
                        description: None,
                        made_by_user: false,
                    },
                    part_names: vec![],
                    quantity: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_is_valid_xlsx_archive() {
        let orders = vec![detail_with_lines(2), detail_with_lines(1)];
        let bytes = build_report(&orders).unwrap();

        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_report_builds_for_empty_order_set() {
        let bytes = build_report(&[]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
