//! End-to-end order flow tests against a live database.
//!
//! These run only when `SHOPPY_TEST_DATABASE_URL` points at a disposable
//! `PostgreSQL` database; without it each test is a no-op pass. Rows are
//! uniquified per run so repeated runs against the same database don't
//! collide.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use shoppy_core::CategoryId;
use shoppy_store::config::SmtpConfig;
use shoppy_store::db::MIGRATOR;
use shoppy_store::db::cart::CartRepository;
use shoppy_store::db::orders::OrderRepository;
use shoppy_store::db::parts::{PartRecord, PartRepository};
use shoppy_store::db::products::{ProductRecord, ProductRepository};
use shoppy_store::db::RepositoryError;
use shoppy_store::models::order::OrderResolution;
use shoppy_store::models::session::CurrentUser;
use shoppy_store::services::auth::AuthService;
use shoppy_store::services::catalog::{CatalogService, UserBuildInput};
use shoppy_store::services::email::Mailer;
use shoppy_store::services::images::ImageStore;
use shoppy_store::services::orders::{CheckoutInput, OrderError, OrderService};

/// Connect and migrate, or skip the test when no database is configured.
async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("SHOPPY_TEST_DATABASE_URL") else {
        eprintln!("SHOPPY_TEST_DATABASE_URL not set; skipping");
        return None;
    };

    let pool = PgPool::connect(&url).await.expect("test database reachable");
    MIGRATOR.run(&pool).await.expect("migrations apply");
    Some(pool)
}

/// A mailer pointed at nowhere; dispatch failures are logged and ignored,
/// which is exactly the production contract.
fn test_mailer() -> Mailer {
    Mailer::new(&SmtpConfig {
        host: "localhost".to_owned(),
        port: 2525,
        username: "test".to_owned(),
        password: SecretString::from("test".to_owned()),
        from_address: "store@localhost".to_owned(),
    })
    .expect("relay config")
}

/// Per-run uniquifier for emails and names.
fn run_tag() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
}

async fn register_user(pool: &PgPool, tag: u128) -> CurrentUser {
    let auth = AuthService::new(pool);
    let user = auth
        .register(&format!("buyer{tag}@example.com"), "a strong password")
        .await
        .expect("register");
    CurrentUser::from(&user)
}

async fn seed_category(pool: &PgPool, tag: u128) -> CategoryId {
    let id: i32 = sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
        .bind(format!("CPU {tag}"))
        .fetch_one(pool)
        .await
        .expect("category");
    CategoryId::new(id)
}

#[tokio::test]
async fn checkout_converts_cart_and_totals_with_shipping() {
    let Some(pool) = test_pool().await else { return };
    let tag = run_tag();
    let mailer = test_mailer();

    let user = register_user(&pool, tag).await;

    let products = ProductRepository::new(&pool);
    let product = products
        .create(ProductRecord {
            name: format!("Office PC {tag}"),
            price: Decimal::new(49_999, 2),
            description: Some("Quiet workhorse".to_owned()),
            made_by_user: false,
            part_ids: vec![],
            image_filenames: vec![],
        })
        .await
        .expect("product");

    let orders = OrderService::new(&pool, &mailer);

    // Additive upsert: 2 + 3 = 5
    orders.add_to_cart(&user, product.id, 2).await.expect("add");
    orders.add_to_cart(&user, product.id, 3).await.expect("add again");

    let (entries, total) = orders.cart(&user).await.expect("cart");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quantity, 5);
    assert_eq!(total, Decimal::new(49_999, 2) * Decimal::from(5));

    let order = orders
        .checkout(
            &user,
            CheckoutInput {
                phone_number: "+1 555 0100".to_owned(),
                address: "12 Main St".to_owned(),
                country: "Canada".to_owned(),
            },
        )
        .await
        .expect("checkout");

    assert_eq!(order.total_price, Decimal::new(49_999, 2) * Decimal::from(5));
    assert_eq!(order.shipping_price, Decimal::from(50));
    assert_eq!(order.address, "Canada, 12 Main St");

    // Cart is cleared atomically with the conversion.
    let (entries, total) = orders.cart(&user).await.expect("cart after");
    assert!(entries.is_empty());
    assert_eq!(total, Decimal::ZERO);

    // Every prior cart line has a matching order line.
    let detail = OrderRepository::new(&pool)
        .get_detail(order.id)
        .await
        .expect("detail")
        .expect("order exists");
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].product.id, product.id);
    assert_eq!(detail.lines[0].quantity, 5);

    // Checkout with an empty cart is a validation failure.
    let err = orders
        .checkout(
            &user,
            CheckoutInput {
                phone_number: "+1 555 0100".to_owned(),
                address: "12 Main St".to_owned(),
                country: "United States".to_owned(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));
}

#[tokio::test]
async fn referenced_product_cannot_be_deleted() {
    let Some(pool) = test_pool().await else { return };
    let tag = run_tag();
    let mailer = test_mailer();

    let user = register_user(&pool, tag).await;

    let products = ProductRepository::new(&pool);
    let product = products
        .create(ProductRecord {
            name: format!("Gaming PC {tag}"),
            price: Decimal::from(1500),
            description: None,
            made_by_user: false,
            part_ids: vec![],
            image_filenames: vec![],
        })
        .await
        .expect("product");

    let orders = OrderService::new(&pool, &mailer);
    orders.add_to_cart(&user, product.id, 1).await.expect("add");
    orders
        .checkout(
            &user,
            CheckoutInput {
                phone_number: "+1 555 0101".to_owned(),
                address: "1 Elm St".to_owned(),
                country: "United States".to_owned(),
            },
        )
        .await
        .expect("checkout");

    let err = products.delete(product.id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    // The guard left the product untouched.
    assert!(products.get(product.id).await.expect("get").is_some());
}

#[tokio::test]
async fn fulfillment_cascades_user_builds_and_is_terminal() {
    let Some(pool) = test_pool().await else { return };
    let tag = run_tag();
    let mailer = test_mailer();

    let user = register_user(&pool, tag).await;
    let category = seed_category(&pool, tag).await;

    let parts = PartRepository::new(&pool);
    let part = parts
        .create(PartRecord {
            name: format!("Ryzen {tag}"),
            price: Decimal::from(300),
            category_id: category,
            characteristics: vec![],
            image_filenames: vec![],
        })
        .await
        .expect("part");

    let product_dir = tempfile::tempdir().expect("tempdir");
    let part_dir = tempfile::tempdir().expect("tempdir");
    let product_images = ImageStore::open(product_dir.path()).expect("store");
    let part_images = ImageStore::open(part_dir.path()).expect("store");
    let catalog = CatalogService::new(&pool, &product_images, &part_images);

    // A user-composed PC goes straight into the cart.
    let build = catalog
        .create_user_build(
            &user,
            UserBuildInput {
                price: Decimal::from(900),
                part_tokens: format!("CPU_{}", part.id),
                quantity: 1,
            },
        )
        .await
        .expect("build");
    assert!(build.made_by_user);

    // Plus one catalog product in the same order.
    let products = ProductRepository::new(&pool);
    let stock = products
        .create(ProductRecord {
            name: format!("Stock PC {tag}"),
            price: Decimal::from(700),
            description: None,
            made_by_user: false,
            part_ids: vec![],
            image_filenames: vec![],
        })
        .await
        .expect("stock product");

    let orders = OrderService::new(&pool, &mailer);
    orders.add_to_cart(&user, stock.id, 2).await.expect("add stock");

    let order = orders
        .checkout(
            &user,
            CheckoutInput {
                phone_number: "+1 555 0102".to_owned(),
                address: "5 Oak St".to_owned(),
                country: "United States".to_owned(),
            },
        )
        .await
        .expect("checkout");
    assert_eq!(order.total_price, Decimal::from(900 + 700 * 2));

    orders
        .fulfill(order.id, OrderResolution::Sent)
        .await
        .expect("fulfill");

    // Order and its lines are gone.
    let detail = OrderRepository::new(&pool).get_detail(order.id).await.expect("query");
    assert!(detail.is_none());

    // The user build was removed with its image rows; the catalog product
    // survives.
    assert!(products.get(build.id).await.expect("get").is_none());
    assert!(products.get(stock.id).await.expect("get").is_some());

    // Fulfilling again reports the order gone (double-fulfillment guard).
    let err = orders
        .fulfill(order.id, OrderResolution::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound));

    // The cart repository no longer sees anything for this user.
    let leftover = CartRepository::new(&pool).entries(user.id).await.expect("entries");
    assert!(leftover.is_empty());
}
