//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPPY_DATABASE_URL` - `PostgreSQL` connection string
//! - `SMTP_USERNAME` - SMTP login for the notification relay
//! - `SMTP_PASSWORD` - SMTP password for the notification relay
//!
//! ## Optional
//! - `SHOPPY_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPPY_PORT` - Listen port (default: 8080)
//! - `SHOPPY_PRODUCT_IMAGE_DIR` - Product image directory (default: static/product_images)
//! - `SHOPPY_PART_IMAGE_DIR` - Part image directory (default: static/part_images)
//! - `SMTP_HOST` - SMTP relay host (default: smtp.gmail.com)
//! - `SMTP_PORT` - SMTP relay port (default: 587)
//! - `SMTP_FROM` - From address (default: the SMTP username)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Store application configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Outbound mail relay configuration
    pub smtp: SmtpConfig,
    /// Directory for uploaded product images
    pub product_image_dir: PathBuf,
    /// Directory for uploaded part images
    pub part_image_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// SMTP relay configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// Relay hostname, connected via STARTTLS
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Login username
    pub username: String,
    /// Login password
    pub password: SecretString,
    /// From address on outgoing notifications
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let smtp_username = require_var("SMTP_USERNAME")?;
        let from_address = optional_var("SMTP_FROM").unwrap_or_else(|| smtp_username.clone());

        Ok(Self {
            database_url: SecretString::from(require_var("SHOPPY_DATABASE_URL")?),
            host: parse_var("SHOPPY_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: parse_var("SHOPPY_PORT", 8080)?,
            smtp: SmtpConfig {
                host: optional_var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_owned()),
                port: parse_var("SMTP_PORT", 587)?,
                username: smtp_username,
                password: SecretString::from(require_var("SMTP_PASSWORD")?),
                from_address,
            },
            product_image_dir: optional_var("SHOPPY_PRODUCT_IMAGE_DIR")
                .map_or_else(|| PathBuf::from("static/product_images"), PathBuf::from),
            part_image_dir: optional_var("SHOPPY_PART_IMAGE_DIR")
                .map_or_else(|| PathBuf::from("static/part_images"), PathBuf::from),
            sentry_dsn: optional_var("SENTRY_DSN"),
        })
    }

    /// Load only the database URL, for tools that don't need the full config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SHOPPY_DATABASE_URL` is not set.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(SecretString::from(require_var("SHOPPY_DATABASE_URL")?))
    }

    /// The address the server binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Read a required environment variable.
fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

/// Read an optional environment variable, treating empty as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read and parse an optional environment variable, falling back to a default.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidEnvVar(name.to_owned(), raw)),
        None => Ok(default),
    }
}
