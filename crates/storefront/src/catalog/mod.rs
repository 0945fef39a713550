//! Read-only catalog client for the WooCommerce REST API (v3).
//!
//! # Architecture
//!
//! - Authenticated with `consumer_key` / `consumer_secret` query parameters
//! - Every request has a timeout; transient failures (network errors, 408,
//!   429, 502, 503, 504) are retried with capped exponential backoff
//! - In-memory caching via `moka` for responses (5 minute TTL); search
//!   queries are not cached
//!
//! # Example
//!
//! ```rust,ignore
//! use rooh_storefront::catalog::{CatalogClient, ProductQuery};
//!
//! let catalog = CatalogClient::new(config.catalog_api_url(), &catalog_config)?;
//! let products = catalog.get_products(&ProductQuery::default()).await?;
//! let product = catalog.get_product_by_slug("oud-mist").await?;
//! ```

mod cache;
mod conversions;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use rooh_core::{Category, CategoryId, Product, ProductId};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{CatalogConfig, StoreConfig};

use cache::{CacheKey, CacheValue};
use conversions::{WooCategory, WooProduct, convert_category, convert_product};
pub use retry::RetryPolicy;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed before a response arrived (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request path could not be joined onto the API base.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success response.
    #[error("Catalog API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every allowed attempt failed with a transient error.
    #[error("Catalog request failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<CatalogError>,
    },
}

impl CatalogError {
    /// Whether another attempt might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => {
                StatusCode::from_u16(*status).is_ok_and(retry::is_transient_status)
            }
            _ => false,
        }
    }
}

/// Sort direction for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub per_page: u32,
    pub page: Option<u32>,
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    /// e.g. `date`, `price`, `popularity`.
    pub orderby: Option<String>,
    pub order: Option<SortOrder>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            per_page: 20,
            page: None,
            category: None,
            search: None,
            orderby: None,
            order: None,
        }
    }
}

impl ProductQuery {
    /// Products in one category.
    #[must_use]
    pub fn in_category(category: CategoryId) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("per_page", self.per_page.to_string())];
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.to_string()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(orderby) = &self.orderby {
            params.push(("orderby", orderby.clone()));
        }
        if let Some(order) = self.order {
            params.push(("order", order.as_str().to_string()));
        }
        params
    }
}

/// Filters for `GET /products/categories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryQuery {
    pub per_page: u32,
    pub hide_empty: bool,
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            per_page: 50,
            hide_empty: true,
        }
    }
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for products and categories.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    consumer_key: String,
    consumer_secret: SecretString,
    retry: RetryPolicy,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a client for the REST API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, config: &CatalogConfig) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url,
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                retry: RetryPolicy::new(config.max_attempts, config.backoff_base),
                cache,
            }),
        })
    }

    /// Client for the configured store, or `None` when no catalog
    /// credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>, CatalogError> {
        config
            .catalog
            .as_ref()
            .map(|catalog| Self::new(config.catalog_api_url(), catalog))
            .transpose()
    }

    /// GET with retries, deserializing the final successful body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.inner.base_url.join(path)?;
        let attempts = self.inner.retry.attempts();
        let mut attempt = 0;

        let body = loop {
            attempt += 1;
            match self.fetch_once(&url, params).await {
                Ok(body) => break body,
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.inner.retry.delay_after(attempt);
                    warn!(
                        path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(CatalogError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        };

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }

    async fn fetch_once(
        &self,
        url: &Url,
        params: &[(&'static str, String)],
    ) -> Result<String, CatalogError> {
        let response = self
            .inner
            .client
            .get(url.clone())
            .query(&[
                ("consumer_key", self.inner.consumer_key.as_str()),
                ("consumer_secret", self.inner.consumer_secret.expose_secret()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| body.chars().take(200).collect());
        Err(CatalogError::Status {
            status: status.as_u16(),
            message,
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails after all retries.
    #[instrument(skip(self), fields(page = ?query.page, category = ?query.category))]
    pub async fn get_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let cache_key = CacheKey::Products(query.clone());
        let cacheable = query.search.is_none();

        if cacheable
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let raw: Vec<WooProduct> = self.get_json("products", &query.params()).await?;
        let products: Vec<Product> = raw.into_iter().map(convert_product).collect();

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown ID, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let raw: WooProduct = match self.get_json(&format!("products/{id}"), &[]).await {
            Err(CatalogError::Status { status: 404, .. }) => {
                return Err(CatalogError::NotFound(format!("Product not found: {id}")));
            }
            other => other?,
        };
        let product = convert_product(raw);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a product by slug; `None` when no product has that slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        let cache_key = CacheKey::ProductSlug(slug.to_string());

        if let Some(CacheValue::ProductSlug(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product slug");
            return Ok(product.map(|product| *product));
        }

        let params = [("slug", slug.to_string()), ("per_page", "1".to_string())];
        let raw: Vec<WooProduct> = self.get_json("products", &params).await?;
        let product = raw.into_iter().next().map(convert_product);

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::ProductSlug(product.clone().map(Box::new)),
            )
            .await;

        Ok(product)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails after all retries.
    #[instrument(skip(self))]
    pub async fn get_categories(&self, query: CategoryQuery) -> Result<Vec<Category>, CatalogError> {
        let cache_key = CacheKey::Categories {
            per_page: query.per_page,
            hide_empty: query.hide_empty,
        };

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let params = [
            ("per_page", query.per_page.to_string()),
            ("hide_empty", query.hide_empty.to_string()),
        ];
        let raw: Vec<WooCategory> = self.get_json("products/categories", &params).await?;
        let categories: Vec<Category> = raw.into_iter().map(convert_category).collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&CacheKey::Product(id)).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_product_params() {
        let params = ProductQuery::default().params();
        assert_eq!(params, vec![("per_page", "20".to_string())]);
    }

    #[test]
    fn test_product_params_full() {
        let query = ProductQuery {
            per_page: 12,
            page: Some(2),
            category: Some(CategoryId::new(3)),
            search: Some("oud".to_string()),
            orderby: Some("price".to_string()),
            order: Some(SortOrder::Desc),
        };
        let params = query.params();
        assert!(params.contains(&("page", "2".to_string())));
        assert!(params.contains(&("category", "3".to_string())));
        assert!(params.contains(&("order", "desc".to_string())));
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_status_transience() {
        let unavailable = CatalogError::Status {
            status: 503,
            message: String::new(),
        };
        let not_found = CatalogError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(unavailable.is_transient());
        assert!(!not_found.is_transient());
        assert!(!CatalogError::NotFound("x".to_string()).is_transient());
    }

    #[test]
    fn test_exhausted_display_includes_cause() {
        let err = CatalogError::Exhausted {
            attempts: 3,
            last: Box::new(CatalogError::Status {
                status: 503,
                message: "busy".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "Catalog request failed after 3 attempts: Catalog API returned 503: busy"
        );
    }
}
