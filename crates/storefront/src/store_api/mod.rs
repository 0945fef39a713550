//! WooCommerce Store API (v1) gateway.
//!
//! # Architecture
//!
//! - The server is the source of truth for the cart; nothing is cached here
//! - Every response's `Cart-Token` / `Nonce` headers are captured into the
//!   [`SessionStore`] before anything else looks at the body
//! - Mutating calls carry a nonce obtained through the [`SessionBootstrapper`]
//! - A rejected nonce on a mutating call triggers exactly one
//!   re-bootstrap and resend; a second rejection is a hard error
//!
//! # Example
//!
//! ```rust,ignore
//! use rooh_storefront::store_api::StoreApiClient;
//!
//! let client = StoreApiClient::from_config(&config, store)?;
//! let cart = client.add_item(ProductId::new(42), 1).await?;
//! ```

mod conversions;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
mod wire;

use std::sync::Arc;

use rooh_core::{
    CartSnapshot, CheckoutRequest, LineKey, OrderResult, PackageId, PaymentMethod, ProductId,
    ShippingAddressUpdate,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::StoreConfig;
use crate::session::{SessionBootstrapper, SessionStore};

pub use transport::{CartTransport, ReqwestTransport, StoreMethod, StoreRequest, StoreResponse};

use conversions::convert_cart;

/// Error codes the Store API uses for a missing or rejected nonce.
pub const NONCE_ERROR_CODES: [&str; 2] = [
    "woocommerce_rest_missing_nonce",
    "woocommerce_rest_invalid_nonce",
];

/// Errors that can occur when talking to the Store API.
#[derive(Debug, Error)]
pub enum StoreApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request path could not be joined onto the API base.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server rejected (or did not receive) the nonce.
    #[error("Nonce rejected ({code}): {message}")]
    InvalidNonce { code: String, message: String },

    /// Any other non-success response.
    #[error("Store API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The bootstrap response did not carry a usable credential pair.
    #[error("Store API response carried no {0}")]
    MissingCredentials(&'static str),

    /// A shared bootstrap attempt failed; every waiter sees the same cause.
    #[error("Session bootstrap failed: {0}")]
    Bootstrap(Arc<StoreApiError>),
}

impl StoreApiError {
    /// Whether this is a nonce rejection (directly or via bootstrap).
    #[must_use]
    pub fn is_nonce_error(&self) -> bool {
        match self {
            Self::InvalidNonce { .. } => true,
            Self::Bootstrap(inner) => inner.is_nonce_error(),
            _ => false,
        }
    }

    /// HTTP status of an API error response, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::InvalidNonce { .. } => None,
            Self::Bootstrap(inner) => inner.status(),
            Self::Http(e) => e.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Build the error for a non-success response.
    pub(crate) fn from_response(response: &StoreResponse) -> Self {
        let body: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
        let code = body.code.unwrap_or_else(|| "unknown".to_string());
        let message = body
            .message
            .unwrap_or_else(|| response.body.chars().take(200).collect());

        if NONCE_ERROR_CODES.contains(&code.as_str()) {
            return Self::InvalidNonce { code, message };
        }

        Self::Api {
            status: body
                .data
                .and_then(|data| data.status)
                .unwrap_or_else(|| response.status.as_u16()),
            code,
            message,
        }
    }
}

/// Error body shape: `{"code": ..., "message": ..., "data": {"status": ...}}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    status: Option<u16>,
}

// =============================================================================
// StoreApiClient
// =============================================================================

/// Client for the cart, shipping and checkout endpoints of the Store API.
#[derive(Clone)]
pub struct StoreApiClient {
    inner: Arc<StoreApiClientInner>,
}

struct StoreApiClientInner {
    transport: Arc<dyn CartTransport>,
    store: Arc<dyn SessionStore>,
    session: SessionBootstrapper,
}

impl StoreApiClient {
    /// Create a client over an existing transport and session store.
    #[must_use]
    pub fn new(transport: Arc<dyn CartTransport>, store: Arc<dyn SessionStore>) -> Self {
        let session = SessionBootstrapper::new(Arc::clone(&transport), Arc::clone(&store));
        Self {
            inner: Arc::new(StoreApiClientInner {
                transport,
                store,
                session,
            }),
        }
    }

    /// Create a client for the store configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(
        config: &StoreConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, StoreApiError> {
        let transport = ReqwestTransport::new(config.store_api_url())?;
        Ok(Self::new(Arc::new(transport), store))
    }

    /// The bootstrapper sharing this client's transport and store.
    #[must_use]
    pub fn session(&self) -> &SessionBootstrapper {
        &self.inner.session
    }

    /// The session store credentials are captured into.
    #[must_use]
    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// Send a request and deserialize a successful body.
    ///
    /// Mutating requests rejected for their nonce are retried once against a
    /// freshly bootstrapped session.
    async fn execute<T: DeserializeOwned>(&self, request: StoreRequest) -> Result<T, StoreApiError> {
        let response = match self.send_once(request.clone()).await {
            Err(e) if e.is_nonce_error() && request.method.is_mutating() => {
                warn!(
                    path = %request.path,
                    error = %e,
                    "Nonce rejected, refreshing cart session and retrying once"
                );
                self.inner.session.reset();
                self.send_once(request).await?
            }
            other => other?,
        };

        serde_json::from_str(&response.body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response.body.chars().take(500).collect::<String>(),
                "Failed to parse Store API response"
            );
            StoreApiError::Parse(e)
        })
    }

    /// One round trip: attach credentials, capture what comes back, classify.
    async fn send_once(&self, request: StoreRequest) -> Result<StoreResponse, StoreApiError> {
        let request = if request.method.is_mutating() {
            let active = self.inner.session.ensure_session().await?;
            request.with_session(active)
        } else {
            let cart_token = self.inner.store.load().cart_token;
            request.with_cart_token(cart_token)
        };

        let response = self.inner.transport.send(request).await?;
        self.inner.session.capture(&response);

        if response.status.is_success() {
            Ok(response)
        } else {
            let error = StoreApiError::from_response(&response);
            debug!(status = %response.status, error = %error, "Store API returned non-success status");
            Err(error)
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartSnapshot, StoreApiError> {
        let cart = self.execute::<wire::StoreCart>(StoreRequest::get("cart")).await?;
        Ok(convert_cart(cart))
    }

    /// Add `quantity` of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the item or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot, StoreApiError> {
        let request = StoreRequest::post(
            "cart/add-item",
            json!({ "id": product_id, "quantity": quantity }),
        );
        Ok(convert_cart(self.execute(request).await?))
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update_item_quantity(
        &self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<CartSnapshot, StoreApiError> {
        let request = StoreRequest::post(
            "cart/update-item",
            json!({ "key": key, "quantity": quantity }),
        );
        Ok(convert_cart(self.execute(request).await?))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove_item(&self, key: &LineKey) -> Result<CartSnapshot, StoreApiError> {
        let request = StoreRequest::post("cart/remove-item", json!({ "key": key }));
        Ok(convert_cart(self.execute(request).await?))
    }

    // =========================================================================
    // Shipping & Checkout Methods
    // =========================================================================

    /// Send a (partial) shipping address so the server can quote rates.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected or the request fails.
    #[instrument(skip(self, address), fields(country = %address.country))]
    pub async fn update_shipping_address(
        &self,
        address: &ShippingAddressUpdate,
    ) -> Result<CartSnapshot, StoreApiError> {
        let request = StoreRequest::post(
            "cart/update-customer",
            json!({ "shipping_address": address }),
        );
        Ok(convert_cart(self.execute(request).await?))
    }

    /// Choose a shipping rate for a package.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is unknown or the request fails.
    #[instrument(skip(self), fields(package_id = %package_id, rate_id = %rate_id))]
    pub async fn select_shipping_rate(
        &self,
        package_id: PackageId,
        rate_id: &str,
    ) -> Result<CartSnapshot, StoreApiError> {
        let request = StoreRequest::post(
            "cart/select-shipping-rate",
            json!({ "package_id": package_id, "rate_id": rate_id }),
        );
        Ok(convert_cart(self.execute(request).await?))
    }

    /// List the payment gateways available for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn get_payment_methods(&self) -> Result<Vec<PaymentMethod>, StoreApiError> {
        self.execute(StoreRequest::get("payment-methods")).await
    }

    /// Place the order.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the checkout or the request fails.
    /// A declined payment is *not* an error here; see [`OrderResult::outcome`].
    #[instrument(skip(self, checkout), fields(payment_method = %checkout.payment_method))]
    pub async fn checkout(&self, checkout: &CheckoutRequest) -> Result<OrderResult, StoreApiError> {
        let request = StoreRequest::post("checkout", serde_json::to_value(checkout)?);
        self.execute(request).await
    }
}
