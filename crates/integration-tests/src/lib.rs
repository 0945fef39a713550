//! Integration tests for the Rooh storefront.
//!
//! [`MockStoreApi`] serves a small in-memory WooCommerce over real HTTP so the
//! storefront's `reqwest` transport, session capture, nonce recovery and
//! catalog retries can be exercised end to end.
//!
//! # Behaviour
//!
//! - `GET /cart` assigns a cart token when none is sent and issues a new
//!   nonce on every call; only the latest nonce is accepted
//! - Mutations check the `Nonce` header and can be told to reject the next
//!   N nonces regardless
//! - Catalog endpoints require `consumer_key=ck_test` and can be told to
//!   answer the next N requests with 503
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rooh-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rooh_storefront::config::{CatalogConfig, ConfigError, StoreConfig};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Consumer key the mock catalog accepts.
pub const CONSUMER_KEY: &str = "ck_test";

/// Price of every mock product, in cents.
pub const UNIT_PRICE: i64 = 1000;

/// A mutation as the mock server saw it.
#[derive(Debug, Clone)]
pub struct RecordedMutation {
    pub path: String,
    pub cart_token: Option<String>,
    pub nonce: Option<String>,
    pub body: Value,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
struct MockLine {
    key: String,
    product_id: i64,
    quantity: u32,
}

#[derive(Debug, Default)]
struct MockCart {
    token_seq: u64,
    nonce_seq: u64,
    current_nonce: Option<String>,
    lines: Vec<MockLine>,
    selected_rate: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    cart: Mutex<MockCart>,
    cart_delay: Mutex<Duration>,
    reject_nonces: AtomicUsize,
    catalog_failures: AtomicUsize,
    cart_reads: AtomicUsize,
    catalog_requests: AtomicUsize,
    mutations: Mutex<Vec<RecordedMutation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement `counter` if positive; true when it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// A running mock store.
pub struct MockStoreApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockStoreApi {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::clone(&state));

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Store origin, e.g. `http://127.0.0.1:4123/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Storefront configuration pointing at this server, with fast catalog
    /// retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn config(&self) -> Result<StoreConfig, ConfigError> {
        let mut config = StoreConfig::with_base_url(&self.base_url())?;
        config.catalog = Some(CatalogConfig {
            consumer_key: CONSUMER_KEY.to_string(),
            consumer_secret: SecretString::from("cs_test"),
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base: Duration::from_millis(10),
        });
        Ok(config)
    }

    /// Delay every `GET /cart` response.
    pub fn set_cart_delay(&self, delay: Duration) {
        *lock(&self.state.cart_delay) = delay;
    }

    /// Reject the next `n` mutations with an invalid-nonce error.
    pub fn reject_next_nonces(&self, n: usize) {
        self.state.reject_nonces.store(n, Ordering::SeqCst);
    }

    /// Answer the next `n` catalog requests with 503.
    pub fn fail_next_catalog_requests(&self, n: usize) {
        self.state.catalog_failures.store(n, Ordering::SeqCst);
    }

    /// Number of `GET /cart` requests served.
    #[must_use]
    pub fn cart_reads(&self) -> usize {
        self.state.cart_reads.load(Ordering::SeqCst)
    }

    /// Number of catalog requests served (including failures).
    #[must_use]
    pub fn catalog_requests(&self) -> usize {
        self.state.catalog_requests.load(Ordering::SeqCst)
    }

    /// Every mutation received, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<RecordedMutation> {
        lock(&self.state.mutations).clone()
    }

    /// Sum of line quantities in the server cart.
    #[must_use]
    pub fn server_quantity(&self) -> u32 {
        lock(&self.state.cart).lines.iter().map(|l| l.quantity).sum()
    }
}

impl Drop for MockStoreApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/wp-json/wc/store/v1/cart", get(get_cart))
        .route("/wp-json/wc/store/v1/cart/add-item", post(add_item))
        .route("/wp-json/wc/store/v1/cart/update-item", post(update_item))
        .route("/wp-json/wc/store/v1/cart/remove-item", post(remove_item))
        .route("/wp-json/wc/store/v1/cart/update-customer", post(update_customer))
        .route(
            "/wp-json/wc/store/v1/cart/select-shipping-rate",
            post(select_shipping_rate),
        )
        .route("/wp-json/wc/store/v1/payment-methods", get(payment_methods))
        .route("/wp-json/wc/store/v1/checkout", post(checkout))
        .route("/wp-json/wc/v3/products", get(list_products))
        .route("/wp-json/wc/v3/products/categories", get(list_categories))
        .route("/wp-json/wc/v3/products/{id}", get(get_product))
        .with_state(state)
}

// =============================================================================
// Store API handlers
// =============================================================================

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "message": message,
            "data": { "status": status.as_u16() }
        })),
    )
        .into_response()
}

/// Cart JSON plus credential headers.
fn cart_response(cart: &MockCart, token: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(value) = token.and_then(|t| HeaderValue::from_str(t).ok()) {
        headers.insert("Cart-Token", value);
    }
    if let Some(value) = cart
        .current_nonce
        .as_deref()
        .and_then(|n| HeaderValue::from_str(n).ok())
    {
        headers.insert("Nonce", value);
    }
    (StatusCode::OK, headers, Json(cart_json(cart))).into_response()
}

fn money_fields() -> Value {
    json!({ "currency_code": "USD", "currency_minor_unit": 2, "currency_symbol": "$" })
}

fn with_currency(fields: Value) -> Value {
    let mut merged = money_fields();
    if let (Some(target), Value::Object(extra)) = (merged.as_object_mut(), fields) {
        target.extend(extra);
    }
    merged
}

fn cart_json(cart: &MockCart) -> Value {
    let items: Vec<Value> = cart
        .lines
        .iter()
        .map(|line| {
            let total = (i64::from(line.quantity) * UNIT_PRICE).to_string();
            json!({
                "key": line.key,
                "id": line.product_id,
                "name": format!("Product {}", line.product_id),
                "quantity": line.quantity,
                "short_description": "",
                "images": [],
                "prices": with_currency(json!({
                    "price": UNIT_PRICE.to_string(),
                    "regular_price": UNIT_PRICE.to_string(),
                    "sale_price": UNIT_PRICE.to_string()
                })),
                "totals": with_currency(json!({ "line_subtotal": total, "line_total": total })),
            })
        })
        .collect();
    let count: u32 = cart.lines.iter().map(|line| line.quantity).sum();
    let items_total = i64::from(count) * UNIT_PRICE;
    let shipping: i64 = if cart.lines.is_empty() { 0 } else { 500 };
    let selected = cart.selected_rate.as_deref().unwrap_or("flat_rate:1");

    let packages = if cart.lines.is_empty() {
        Vec::new()
    } else {
        let package_items: Vec<Value> = cart
            .lines
            .iter()
            .map(|line| {
                json!({
                    "key": line.key,
                    "name": format!("Product {}", line.product_id),
                    "quantity": line.quantity
                })
            })
            .collect();
        vec![json!({
            "package_id": 0,
            "name": "Shipment 1",
            "destination": { "country": "AE" },
            "items": package_items,
            "shipping_rates": [
                with_currency(json!({"rate_id": "flat_rate:1", "name": "Flat rate", "price": "500",
                                     "selected": selected == "flat_rate:1"})),
                with_currency(json!({"rate_id": "local_pickup:2", "name": "Pickup", "price": "0",
                                     "selected": selected == "local_pickup:2"}))
            ]
        })]
    };

    let total_shipping = if cart.lines.is_empty() {
        Value::Null
    } else {
        Value::String(shipping.to_string())
    };

    json!({
        "items": items,
        "items_count": count,
        "needs_shipping": !cart.lines.is_empty(),
        "shipping_rates": packages,
        "totals": with_currency(json!({
            "total_items": items_total.to_string(),
            "total_shipping": total_shipping,
            "total_tax": "0",
            "total_price": (items_total + shipping).to_string()
        })),
    })
}

async fn get_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.cart_reads.fetch_add(1, Ordering::SeqCst);
    let delay = *lock(&state.cart_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut cart = lock(&state.cart);
    let token = if let Some(token) = header(&headers, "Cart-Token") {
        token
    } else {
        cart.token_seq += 1;
        format!("tok-{}", cart.token_seq)
    };
    cart.nonce_seq += 1;
    cart.current_nonce = Some(format!("nonce-{}", cart.nonce_seq));
    cart_response(&cart, Some(&token))
}

/// Record a mutation and check its nonce.
fn authorize(state: &MockState, path: &str, headers: &HeaderMap, body: &Value) -> Result<(), Response> {
    let nonce = header(headers, "Nonce");
    let forced = take_one(&state.reject_nonces);
    let accepted = !forced
        && nonce.is_some()
        && nonce.as_deref() == lock(&state.cart).current_nonce.as_deref();

    lock(&state.mutations).push(RecordedMutation {
        path: path.to_string(),
        cart_token: header(headers, "Cart-Token"),
        nonce: nonce.clone(),
        body: body.clone(),
        accepted,
    });

    if accepted {
        Ok(())
    } else if nonce.is_none() {
        Err(error_response(
            StatusCode::UNAUTHORIZED,
            "woocommerce_rest_missing_nonce",
            "Missing the Nonce header.",
        ))
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "woocommerce_rest_invalid_nonce",
            "Nonce is invalid.",
        ))
    }
}

fn body_u32(body: &Value, field: &str) -> Option<u32> {
    body.get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

async fn add_item(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "cart/add-item", &headers, &body) {
        return rejection;
    }
    let Some(product_id) = body.get("id").and_then(Value::as_i64) else {
        return error_response(StatusCode::BAD_REQUEST, "rest_missing_callback_param", "Missing id");
    };
    let quantity = body_u32(&body, "quantity").unwrap_or(1);
    if product_id == OUT_OF_STOCK_ID {
        return error_response(
            StatusCode::BAD_REQUEST,
            "woocommerce_rest_product_out_of_stock",
            "You cannot add that amount to the cart because the product is out of stock.",
        );
    }

    let mut cart = lock(&state.cart);
    let key = format!("key-{product_id}");
    if let Some(line) = cart.lines.iter_mut().find(|line| line.key == key) {
        line.quantity += quantity;
    } else {
        cart.lines.push(MockLine {
            key,
            product_id,
            quantity,
        });
    }
    cart_response(&cart, None)
}

async fn update_item(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "cart/update-item", &headers, &body) {
        return rejection;
    }
    let key = body.get("key").and_then(Value::as_str).unwrap_or_default();
    let quantity = body_u32(&body, "quantity").unwrap_or(0);

    let mut cart = lock(&state.cart);
    let Some(line) = cart.lines.iter_mut().find(|line| line.key == key) else {
        return error_response(
            StatusCode::CONFLICT,
            "woocommerce_rest_cart_invalid_key",
            "Cart item does not exist.",
        );
    };
    line.quantity = quantity;
    cart.lines.retain(|line| line.quantity > 0);
    cart_response(&cart, None)
}

async fn remove_item(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "cart/remove-item", &headers, &body) {
        return rejection;
    }
    let key = body.get("key").and_then(Value::as_str).unwrap_or_default();

    let mut cart = lock(&state.cart);
    let before = cart.lines.len();
    cart.lines.retain(|line| line.key != key);
    if cart.lines.len() == before {
        return error_response(
            StatusCode::CONFLICT,
            "woocommerce_rest_cart_invalid_key",
            "Cart item no longer exists or is invalid.",
        );
    }
    cart_response(&cart, None)
}

async fn update_customer(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "cart/update-customer", &headers, &body) {
        return rejection;
    }
    let cart = lock(&state.cart);
    cart_response(&cart, None)
}

async fn select_shipping_rate(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "cart/select-shipping-rate", &headers, &body) {
        return rejection;
    }
    let mut cart = lock(&state.cart);
    cart.selected_rate = body
        .get("rate_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    cart_response(&cart, None)
}

async fn payment_methods() -> Json<Value> {
    Json(json!([
        { "id": "stripe", "title": "Credit card", "description": "Pay with card" },
        { "id": "cod", "title": "Cash on delivery", "description": "" }
    ]))
}

/// Payment method the mock gateway always declines.
pub const DECLINING_METHOD: &str = "decline";

/// Product the mock store reports as out of stock.
pub const OUT_OF_STOCK_ID: i64 = 999;

async fn checkout(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, "checkout", &headers, &body) {
        return rejection;
    }
    let method = body
        .get("payment_method")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if method == DECLINING_METHOD {
        return Json(json!({
            "order_id": 501,
            "status": "failed",
            "order_key": "wc_order_declined",
            "payment_result": {
                "payment_status": "failure",
                "payment_details": [{ "key": "errorMessage", "value": "Your card was declined." }],
                "redirect_url": ""
            }
        }))
        .into_response();
    }

    lock(&state.cart).lines.clear();
    Json(json!({
        "order_id": 500,
        "status": "processing",
        "order_key": "wc_order_ok",
        "payment_result": { "payment_status": "success", "payment_details": [], "redirect_url": "" }
    }))
    .into_response()
}

// =============================================================================
// Catalog handlers
// =============================================================================

fn catalog_gate(state: &MockState, query: &HashMap<String, String>) -> Result<(), Response> {
    state.catalog_requests.fetch_add(1, Ordering::SeqCst);
    if query.get("consumer_key").map(String::as_str) != Some(CONSUMER_KEY) {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "woocommerce_rest_cannot_view",
            "Sorry, you cannot list resources.",
        ));
    }
    if take_one(&state.catalog_failures) {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into_response());
    }
    Ok(())
}

fn product_json(id: i64, name: &str, slug: &str, sale_price: &str) -> Value {
    let price = if sale_price.is_empty() { "10.00" } else { sale_price };
    json!({
        "id": id,
        "name": name,
        "slug": slug,
        "price": price,
        "regular_price": "10.00",
        "sale_price": sale_price,
        "description": "",
        "short_description": "",
        "images": [{ "id": id * 10, "src": format!("https://cdn.example/{slug}.jpg"), "alt": name }],
        "categories": [{ "id": 3, "name": "Oud", "slug": "oud" }],
        "stock_status": "instock",
        "permalink": format!("https://shop.example/product/{slug}/")
    })
}

fn products() -> Vec<Value> {
    vec![
        product_json(42, "Oud Mist", "oud-mist", "8.00"),
        product_json(51, "Rose Dusk", "rose-dusk", ""),
    ]
}

async fn list_products(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = catalog_gate(&state, &query) {
        return rejection;
    }
    let matching: Vec<Value> = products()
        .into_iter()
        .filter(|product| {
            query
                .get("slug")
                .is_none_or(|slug| product["slug"].as_str() == Some(slug.as_str()))
        })
        .collect();
    Json(Value::Array(matching)).into_response()
}

async fn get_product(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = catalog_gate(&state, &query) {
        return rejection;
    }
    products()
        .into_iter()
        .find(|product| product["id"].as_i64() == Some(id))
        .map_or_else(
            || {
                error_response(
                    StatusCode::NOT_FOUND,
                    "woocommerce_rest_product_invalid_id",
                    "Invalid ID.",
                )
            },
            |product| Json(product).into_response(),
        )
}

async fn list_categories(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = catalog_gate(&state, &query) {
        return rejection;
    }
    Json(json!([
        { "id": 3, "name": "Oud", "slug": "oud", "description": "", "image": null, "count": 2 },
        { "id": 4, "name": "Floral", "slug": "floral", "description": "", "count": 1,
          "image": { "src": "https://cdn.example/floral.jpg", "alt": "Floral" } }
    ]))
    .into_response()
}
