//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use shoppy_core::{Email, UserId};

/// A registered store user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Whether this user may access the admin back-office.
    pub is_admin: bool,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
