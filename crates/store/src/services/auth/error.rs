//! Authentication error types.

use thiserror::Error;

use shoppy_core::EmailError;

use crate::db::RepositoryError;

/// Errors from authentication operations and route guards.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password combination is wrong.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration attempted with an email that is already taken.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Email failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password failed validation.
    #[error("password must be at least 8 characters")]
    WeakPassword,

    /// Password hashing failed.
    #[error("failed to hash password")]
    PasswordHash,

    /// A login-required route was hit without a session.
    #[error("you have to log in first")]
    NotLoggedIn,

    /// An admin-only route was hit by a non-admin user.
    #[error("admin only")]
    AdminOnly,

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
