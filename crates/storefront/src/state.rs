//! Wiring shared across the storefront.

use std::sync::Arc;

use thiserror::Error;

use crate::cart::{CartCoordinator, HandoffTarget};
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::StoreConfig;
use crate::session::{FileSessionStore, SessionStore};
use crate::store_api::{StoreApiClient, StoreApiError};

/// Error assembling the storefront.
#[derive(Debug, Error)]
pub enum StorefrontInitError {
    #[error("store API client: {0}")]
    StoreApi(#[from] StoreApiError),
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
}

/// Everything a UI needs: the cart coordinator and, when configured, the
/// catalog.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StoreConfig,
    cart: CartCoordinator,
    catalog: Option<CatalogClient>,
}

impl Storefront {
    /// Build the storefront with a file-backed session store.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: StoreConfig) -> Result<Self, StorefrontInitError> {
        let store = Arc::new(FileSessionStore::open(
            &config.session_file,
            config.nonce_ttl_chrono(),
        ));
        Self::with_store(config, store)
    }

    /// Build the storefront over any session store.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn with_store(
        config: StoreConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, StorefrontInitError> {
        let api = StoreApiClient::from_config(&config, store)?;
        let cart = CartCoordinator::new(api, HandoffTarget::from_config(&config));
        let catalog = CatalogClient::from_config(&config)?;

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                cart,
                catalog,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cart(&self) -> &CartCoordinator {
        &self.inner.cart
    }

    /// The catalog client, if catalog credentials are configured.
    #[must_use]
    pub fn catalog(&self) -> Option<&CatalogClient> {
        self.inner.catalog.as_ref()
    }
}
