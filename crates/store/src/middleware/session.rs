//! Session layer configuration.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
const SESSION_COOKIE_NAME: &str = "shoppy_session";

/// Sessions expire after 30 days of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60 * 24 * 30;

/// Build the session management layer over a `PostgreSQL` session store.
///
/// The store's own migration (`PostgresStore::migrate`) must have been run
/// before serving traffic. The cookie is not marked secure here; TLS
/// termination happens upstream of this binary.
pub fn session_layer(store: PostgresStore) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
