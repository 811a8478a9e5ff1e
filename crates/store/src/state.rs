//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StoreConfig;
use crate::services::email::Mailer;
use crate::services::images::ImageStore;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An image directory could not be created.
    #[error("image store error: {0}")]
    ImageStore(#[from] std::io::Error),
    /// The SMTP relay could not be configured. Fatal by design: a dispatcher
    /// that cannot reach its relay should never serve fulfillment requests.
    #[error("mail relay error: {0}")]
    Mailer(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the database pool, the
/// mail dispatcher, and the image stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StoreConfig,
    pool: PgPool,
    mailer: Mailer,
    product_images: ImageStore,
    part_images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an image directory cannot be created or the mail
    /// relay cannot be configured.
    pub fn new(config: StoreConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = Mailer::new(&config.smtp)?;
        let product_images = ImageStore::open(&config.product_image_dir)?;
        let part_images = ImageStore::open(&config.part_image_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mailer,
                product_images,
                part_images,
            }),
        })
    }

    /// Get a reference to the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the mail dispatcher.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn product_images(&self) -> &ImageStore {
        &self.inner.product_images
    }

    /// Get a reference to the part image store.
    #[must_use]
    pub fn part_images(&self) -> &ImageStore {
        &self.inner.part_images
    }
}
