//! Authentication extractors.
//!
//! Route handlers take [`RequireUser`] or [`RequireAdmin`] as an argument to
//! guard access; the extracted [`CurrentUser`] value is then passed into
//! service calls explicitly.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session::{CurrentUser, session_keys};
use crate::services::auth::AuthError;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a logged-in admin user.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally reads the current user without rejecting.
pub struct OptionalUser(pub Option<CurrentUser>);

/// Rejection for the auth extractors, rendered through `AppError`.
pub struct AuthRejection(AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        AppError::Auth(self.0).into_response()
    }
}

/// Read the current user from the request's session, if any.
async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection(AuthError::NotLoggedIn))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or(AuthRejection(AuthError::NotLoggedIn))?;

        if !user.is_admin {
            return Err(AuthRejection(AuthError::AdminOnly));
        }

        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Store the logged-in identity in the session.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session backend fails.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), AppError> {
    session
        .insert(session_keys::CURRENT_USER, user)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))
}

/// Clear the logged-in identity from the session.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session backend fails.
pub async fn clear_current_user(session: &Session) -> Result<(), AppError> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    Ok(())
}
