//! Business services over the repositories.
//!
//! Handlers validate and extract, services decide, repositories persist.
//! Every multi-step mutation (checkout, fulfillment, product create/delete)
//! has its atomicity boundary at the repository transaction below it.

pub mod auth;
pub mod catalog;
pub mod email;
pub mod images;
pub mod orders;
pub mod report;
