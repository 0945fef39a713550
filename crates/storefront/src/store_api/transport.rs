//! Transport seam between the gateway and the wire.
//!
//! The gateway speaks in [`StoreRequest`] / [`StoreResponse`]; how the cart
//! token and nonce travel (headers here) is the transport's business. Any
//! HTTP status is a successful *transport* result; only network and protocol
//! failures are errors at this layer.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use rooh_core::{ActiveSession, CartToken, CredentialUpdate, Nonce};
use tracing::instrument;
use url::Url;

use super::StoreApiError;

/// Header carrying the cart session token.
pub const CART_TOKEN_HEADER: &str = "Cart-Token";

/// Header carrying the anti-forgery nonce.
pub const NONCE_HEADER: &str = "Nonce";

/// HTTP verbs the Store API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMethod {
    Get,
    Post,
}

impl StoreMethod {
    /// Mutating requests need a nonce.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// A Store API call, relative to the Store API base URL.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub method: StoreMethod,
    /// Path below the API base, e.g. `cart/add-item`.
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub cart_token: Option<CartToken>,
    pub nonce: Option<Nonce>,
}

impl StoreRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: StoreMethod::Get,
            path: path.into(),
            body: None,
            cart_token: None,
            nonce: None,
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: StoreMethod::Post,
            path: path.into(),
            body: Some(body),
            cart_token: None,
            nonce: None,
        }
    }

    /// Attach a cart token (if any).
    #[must_use]
    pub fn with_cart_token(mut self, cart_token: Option<CartToken>) -> Self {
        self.cart_token = cart_token;
        self
    }

    /// Attach a full session, replacing whatever was attached before.
    #[must_use]
    pub fn with_session(mut self, session: ActiveSession) -> Self {
        self.cart_token = Some(session.cart_token);
        self.nonce = Some(session.nonce);
        self
    }
}

/// What came back, whatever the status.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: StatusCode,
    /// Credentials the server attached, if any.
    pub credentials: CredentialUpdate,
    pub body: String,
}

/// Sends Store API requests.
#[async_trait]
pub trait CartTransport: Send + Sync {
    /// Send one request. Exactly one network round trip per call.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was obtained.
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreApiError>;
}

/// `reqwest`-backed transport carrying credentials in headers.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for the Store API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, StoreApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Use an existing client (shared connection pool).
    #[must_use]
    pub const fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl CartTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.path))]
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreApiError> {
        let url = self.base_url.join(&request.path)?;

        let mut builder = match request.method {
            StoreMethod::Get => self.client.get(url),
            StoreMethod::Post => self.client.post(url),
        };
        if let Some(token) = &request.cart_token {
            builder = builder.header(CART_TOKEN_HEADER, token.as_str());
        }
        if let Some(nonce) = &request.nonce {
            builder = builder.header(NONCE_HEADER, nonce.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let credentials = CredentialUpdate::from_raw(
            header_str(response.headers(), CART_TOKEN_HEADER),
            header_str(response.headers(), NONCE_HEADER),
        );
        let body = response.text().await?;

        Ok(StoreResponse {
            status,
            credentials,
            body,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
