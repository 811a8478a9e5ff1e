//! Session-related types.
//!
//! Types stored in the session for authentication state. Handlers extract
//! [`CurrentUser`] and pass it into service calls explicitly; there is no
//! ambient "current user" anywhere below the web layer.

use serde::{Deserialize, Serialize};

use shoppy_core::{Email, UserId};

use crate::models::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Whether this user may access admin routes.
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
