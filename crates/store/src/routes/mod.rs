//! HTTP route handlers for the store.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Catalog listing (admin-catalogued products)
//! GET  /health                   - Health check
//!
//! # Products & PC configurator
//! GET  /products/{id}            - Product detail with images and parts
//! GET  /build/options            - Categories with parts (login required)
//! POST /build                    - Compose a PC and add it to the cart
//!
//! # Cart & checkout (login required)
//! GET  /cart                     - Cart contents and live total
//! POST /cart/add                 - Add product (additive quantity upsert)
//! POST /cart/remove              - Remove product, returns new total
//! GET  /checkout/countries       - Country selector reference data
//! POST /checkout                 - Place an order from the cart
//!
//! # Auth
//! POST /auth/register            - Register and log in
//! POST /auth/login               - Login
//! POST /auth/logout              - Logout
//!
//! # Admin (admin session required)
//! POST   /admin/products         - Create product (multipart)
//! POST   /admin/products/{id}    - Update product (multipart)
//! DELETE /admin/products/{id}    - Delete product (guarded by order refs)
//! GET    /admin/parts/options    - Categories and characteristic labels
//! POST   /admin/parts            - Create part (multipart)
//! GET    /admin/parts/{id}       - Part detail
//! POST   /admin/parts/{id}       - Update part (multipart)
//! DELETE /admin/parts/{id}       - Delete part (guarded by product refs)
//! GET    /admin/orders           - List orders (optional date range)
//! POST   /admin/orders/{id}/send   - Fulfill: mark sent, notify, delete
//! POST   /admin/orders/{id}/reject - Fulfill: reject, notify, delete
//! GET    /admin/report           - xlsx export (optional date range)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the full application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/products/{id}", get(catalog::show))
        .route("/build/options", get(catalog::build_options))
        .route("/build", post(catalog::create_build))
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        .route("/cart/remove", post(cart::remove))
        .route("/checkout/countries", get(cart::countries))
        .route("/checkout", post(cart::checkout))
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}

/// Create the auth routes router.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the admin back-office router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            post(admin::update_product).delete(admin::delete_product),
        )
        .route("/parts/options", get(admin::part_options))
        .route("/parts", post(admin::create_part))
        .route(
            "/parts/{id}",
            get(admin::show_part)
                .post(admin::update_part)
                .delete(admin::delete_part),
        )
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/send", post(admin::send_order))
        .route("/orders/{id}/reject", post(admin::reject_order))
        .route("/report", get(admin::report))
}
