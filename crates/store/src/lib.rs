//! Shoppy store library.
//!
//! An e-commerce storefront for computer parts and PCs: catalog browsing,
//! cart, checkout, order fulfillment, and an admin back-office with report
//! export.
//!
//! # Architecture
//!
//! - Axum web layer: thin handlers that validate input, extract the current
//!   user from the session, and delegate to services
//! - Services: catalog, cart/order, auth, image storage, mail dispatch,
//!   report export
//! - sqlx `PostgreSQL` repositories returning fully-materialized aggregates;
//!   the repository transaction is the atomicity unit for every multi-step
//!   mutation (checkout's cart→order conversion, fulfillment's cascade)
//! - Order notifications go out fire-and-forget on a spawned task

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
