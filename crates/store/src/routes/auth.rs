//! Authentication route handlers.

use axum::{Form, Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
}

/// Register a new user and log them in.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let auth = AuthService::new(state.pool());
    let user = auth.register(&form.email, &form.password).await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;

    Ok((StatusCode::CREATED, Json(current)))
}

/// Login with email and password.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Json<CurrentUser>> {
    let auth = AuthService::new(state.pool());
    let user = auth.login(&form.email, &form.password).await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;

    Ok(Json(current))
}

/// Logout the current user.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
