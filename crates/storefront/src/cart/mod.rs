//! Cart state coordination.
//!
//! [`CartCoordinator`] owns the last known server snapshot and is the only
//! thing the UI talks to. Each operation is one gateway round trip whose
//! response replaces the snapshot wholesale; nothing is merged or patched
//! locally. UI signals go out as [`CartEvent`]s on a broadcast channel.
//!
//! # Races
//!
//! Mutations are not coalesced. For line operations (update/remove) each
//! request gets a per-key sequence number, and a response whose sequence is
//! no longer the latest issued for its key is dropped instead of applied.

pub mod handoff;
pub mod view;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rooh_core::{
    CartSnapshot, CheckoutRequest, LineKey, PackageId, PaymentMethod, PaymentOutcome, ProductId,
    ShippingAddressUpdate,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::store_api::{StoreApiClient, StoreApiError};

pub use handoff::HandoffTarget;
pub use view::{CartItemView, CartView, ImageView};

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 32;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantities below 1 are rejected locally and never sent.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Store API call failed.
    #[error("Store API error: {0}")]
    Api(#[from] StoreApiError),

    /// The payment gateway declined; the cart is untouched.
    #[error("Payment failed: {0}")]
    Payment(String),
}

impl CartError {
    const GENERIC_MESSAGE: &'static str = "Something went wrong. Please try again.";

    /// Text safe to show a shopper.
    ///
    /// Validation messages from the store (out of stock, unknown coupon...)
    /// are shown verbatim; transport and server faults are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidQuantity => "Quantity must be at least 1.".to_string(),
            Self::Payment(message) => message.clone(),
            Self::Api(StoreApiError::Api {
                status, message, ..
            }) if (400..500).contains(status) && !message.is_empty() => message.clone(),
            Self::Api(_) => Self::GENERIC_MESSAGE.to_string(),
        }
    }
}

/// In-flight work on a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOperation {
    Updating,
    Removing,
}

/// Signals for whoever renders the cart.
#[derive(Debug, Clone)]
pub enum CartEvent {
    /// A new snapshot was applied.
    Updated(CartSnapshot),
    /// An item was added; the cart drawer should open.
    OpenCart,
    /// Local cart state and credentials were dropped.
    Cleared,
    /// Leave the app for this URL (checkout handoff or payment redirect).
    Navigate(Url),
}

#[derive(Debug, Default)]
struct CartState {
    cart: Option<CartSnapshot>,
    busy: usize,
    pending: HashMap<LineKey, PendingOperation>,
    latest: HashMap<LineKey, u64>,
    next_seq: u64,
}

// =============================================================================
// CartCoordinator
// =============================================================================

/// Owns the cart snapshot and runs cart operations against the Store API.
#[derive(Clone)]
pub struct CartCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    api: StoreApiClient,
    handoff: HandoffTarget,
    state: Mutex<CartState>,
    events: broadcast::Sender<CartEvent>,
}

/// Decrements the busy counter when an operation ends, however it ends.
struct BusyGuard<'a> {
    state: &'a Mutex<CartState>,
}

impl<'a> BusyGuard<'a> {
    fn enter(state: &'a Mutex<CartState>) -> Self {
        lock_state(state).busy += 1;
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        state.busy = state.busy.saturating_sub(1);
    }
}

fn lock_state(state: &Mutex<CartState>) -> MutexGuard<'_, CartState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CartCoordinator {
    #[must_use]
    pub fn new(api: StoreApiClient, handoff: HandoffTarget) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                handoff,
                state: Mutex::new(CartState::default()),
                events,
            }),
        }
    }

    /// Subscribe to cart events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// Last applied snapshot; `None` until the first successful round trip.
    #[must_use]
    pub fn snapshot(&self) -> Option<CartSnapshot> {
        self.state().cart.clone()
    }

    /// Display view of the current snapshot.
    #[must_use]
    pub fn view(&self) -> CartView {
        CartView::from_snapshot(self.state().cart.as_ref())
    }

    /// Whether any operation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state().busy > 0
    }

    /// Pending operation on a line, if any.
    #[must_use]
    pub fn pending(&self, key: &LineKey) -> Option<PendingOperation> {
        self.state().pending.get(key).copied()
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        lock_state(&self.inner.state)
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn apply(&self, snapshot: &CartSnapshot) {
        self.state().cart = Some(snapshot.clone());
        self.emit(CartEvent::Updated(snapshot.clone()));
    }

    /// Run one snapshot-returning round trip.
    async fn run<F>(&self, operation: &'static str, call: F) -> Result<CartSnapshot, CartError>
    where
        F: Future<Output = Result<CartSnapshot, StoreApiError>>,
    {
        let _busy = BusyGuard::enter(&self.inner.state);
        match call.await {
            Ok(snapshot) => {
                self.apply(&snapshot);
                Ok(snapshot)
            }
            Err(e) => {
                error!(operation, error = %e, "Cart operation failed");
                Err(e.into())
            }
        }
    }

    /// Run a line operation under the per-key sequence guard.
    ///
    /// A superseded response is returned to the caller but not applied.
    async fn run_keyed<F>(
        &self,
        operation: &'static str,
        key: &LineKey,
        pending: PendingOperation,
        call: F,
    ) -> Result<CartSnapshot, CartError>
    where
        F: Future<Output = Result<CartSnapshot, StoreApiError>>,
    {
        let _busy = BusyGuard::enter(&self.inner.state);
        let seq = {
            let mut state = self.state();
            state.next_seq += 1;
            let seq = state.next_seq;
            state.latest.insert(key.clone(), seq);
            state.pending.insert(key.clone(), pending);
            seq
        };

        let result = call.await;

        let is_latest = {
            let mut state = self.state();
            let is_latest = state.latest.get(key) == Some(&seq);
            if is_latest {
                state.latest.remove(key);
                state.pending.remove(key);
            }
            is_latest
        };

        match result {
            Ok(snapshot) if is_latest => {
                self.apply(&snapshot);
                Ok(snapshot)
            }
            Ok(snapshot) => {
                debug!(operation, key = %key, seq, "Dropping superseded cart response");
                Ok(snapshot)
            }
            Err(e) => {
                error!(operation, key = %key, error = %e, "Cart operation failed");
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Cart Operations
    // =========================================================================

    /// Re-read the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the Store API call fails; the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartSnapshot, CartError> {
        self.run("refresh", self.inner.api.get_cart()).await
    }

    /// Add a product and ask the UI to open the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity, or an
    /// error if the server rejects the item.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let snapshot = self
            .run("add_to_cart", self.inner.api.add_item(product_id, quantity))
            .await?;
        self.emit(CartEvent::OpenCart);
        Ok(snapshot)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for zero (use
    /// [`remove_item`](Self::remove_item) instead), or an error if the
    /// server rejects the change.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update_quantity(
        &self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.run_keyed(
            "update_quantity",
            key,
            PendingOperation::Updating,
            self.inner.api.update_item_quantity(key, quantity),
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the removal.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove_item(&self, key: &LineKey) -> Result<CartSnapshot, CartError> {
        self.run_keyed(
            "remove_item",
            key,
            PendingOperation::Removing,
            self.inner.api.remove_item(key),
        )
        .await
    }

    /// Drop the local snapshot and credentials. No network call.
    pub fn clear(&self) {
        {
            let mut state = self.state();
            state.cart = None;
            state.pending.clear();
            state.latest.clear();
        }
        self.inner.api.session().reset();
        self.emit(CartEvent::Cleared);
    }

    /// Hand the cart over to the server-rendered checkout.
    ///
    /// Builds the handoff URL, abandons the local session and emits
    /// [`CartEvent::Navigate`]. An empty (or never loaded) cart is a no-op.
    #[instrument(skip(self))]
    pub fn sync_checkout(&self) -> Option<Url> {
        let url = {
            let state = self.state();
            state
                .cart
                .as_ref()
                .and_then(|cart| self.inner.handoff.url_for(cart))
        };
        let Some(url) = url else {
            debug!("Cart is empty, skipping checkout handoff");
            return None;
        };

        self.clear();
        self.emit(CartEvent::Navigate(url.clone()));
        Some(url)
    }

    // =========================================================================
    // Shipping & Checkout
    // =========================================================================

    /// Send a shipping destination and get re-quoted rates.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the address.
    #[instrument(skip(self, address), fields(country = %address.country))]
    pub async fn shipping_address(
        &self,
        address: &ShippingAddressUpdate,
    ) -> Result<CartSnapshot, CartError> {
        self.run(
            "shipping_address",
            self.inner.api.update_shipping_address(address),
        )
        .await
    }

    /// Choose a shipping rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the rate.
    #[instrument(skip(self))]
    pub async fn select_shipping_rate(
        &self,
        package_id: PackageId,
        rate_id: &str,
    ) -> Result<CartSnapshot, CartError> {
        self.run(
            "select_shipping_rate",
            self.inner.api.select_shipping_rate(package_id, rate_id),
        )
        .await
    }

    /// Payment gateways available for this cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the Store API call fails.
    #[instrument(skip(self))]
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, CartError> {
        let _busy = BusyGuard::enter(&self.inner.state);
        self.inner.api.get_payment_methods().await.map_err(|e| {
            error!(error = %e, "Failed to load payment methods");
            e.into()
        })
    }

    /// Place the order.
    ///
    /// Only [`PaymentOutcome::Complete`] ends the session (see
    /// [`complete_order`](Self::complete_order)). A declined payment, a
    /// pending confirmation and a gateway redirect all leave cart and session
    /// intact, so checkout can be retried if the payment does not go through.
    /// A redirect is also emitted as [`CartEvent::Navigate`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Payment`] when the gateway declines, or an error
    /// if the checkout call fails.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn place_order(
        &self,
        request: &CheckoutRequest,
    ) -> Result<PaymentOutcome, CartError> {
        let order = {
            let _busy = BusyGuard::enter(&self.inner.state);
            self.inner.api.checkout(request).await.map_err(|e| {
                error!(error = %e, "Checkout failed");
                CartError::from(e)
            })?
        };

        let outcome = order.outcome();
        match &outcome {
            PaymentOutcome::Failed { message } => {
                warn!(order_id = %order.order_id, message = %message, "Payment declined");
                return Err(CartError::Payment(message.clone()));
            }
            PaymentOutcome::Complete => {
                if let Err(e) = self.complete_order().await {
                    warn!(error = %e, "Failed to reload cart after checkout");
                }
            }
            PaymentOutcome::RequiresAction { .. } => {
                debug!(order_id = %order.order_id, "Payment awaiting confirmation, keeping cart");
            }
            PaymentOutcome::Redirect(target) => match Url::parse(target) {
                Ok(url) => self.emit(CartEvent::Navigate(url)),
                Err(e) => warn!(target = %target, error = %e, "Ignoring unparseable payment redirect"),
            },
        }

        Ok(outcome)
    }

    /// Finish a paid order: drop the session and load the fresh server cart.
    ///
    /// Called by [`place_order`](Self::place_order) for an immediately
    /// completed payment, and by the UI once a pending confirmation succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the new cart cannot be loaded, in which case the
    /// old snapshot is dropped rather than kept.
    #[instrument(skip(self))]
    pub async fn complete_order(&self) -> Result<CartSnapshot, CartError> {
        self.inner.api.session().reset();
        self.refresh().await.inspect_err(|_| {
            self.state().cart = None;
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rooh_core::{
        Address, BillingAddress, CredentialUpdate, Email, SessionCredentials,
    };

    use super::*;
    use crate::session::{MemorySessionStore, SessionStore};
    use crate::store_api::CartTransport;
    use crate::store_api::testing::{ScriptedTransport, cart_json};

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemorySessionStore>,
        coordinator: CartCoordinator,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemorySessionStore::new());
        store.save(CredentialUpdate::from_raw(Some("tok"), Some("n1")));
        let api = StoreApiClient::new(
            Arc::clone(&transport) as Arc<dyn CartTransport>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        let handoff = HandoffTarget::new(
            Url::parse("https://shop.example.com/").unwrap(),
            "rooh_sync_cart",
        );
        Fixture {
            transport,
            store,
            coordinator: CartCoordinator::new(api, handoff),
        }
    }

    fn checkout_request() -> CheckoutRequest {
        let address = Address {
            first_name: "Layla".to_string(),
            last_name: "Haddad".to_string(),
            address_1: "1 Palm St".to_string(),
            city: "Dubai".to_string(),
            country: "AE".to_string(),
            ..Address::default()
        };
        CheckoutRequest {
            billing_address: BillingAddress {
                address: address.clone(),
                email: Email::parse("layla@example.com").unwrap(),
                phone: "555-0100".to_string(),
            },
            shipping_address: address,
            payment_method: "stripe".to_string(),
            payment_data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 2)]), None, None);
        f.transport.push_ok(cart_json(&[("k1", 42, 2)]), None, None);

        let first = f.coordinator.refresh().await.unwrap();
        let second = f.coordinator.refresh().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.coordinator.snapshot(), Some(second));
        assert!(!f.coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_add_to_cart_emits_open_cart() {
        let f = fixture();
        let mut events = f.coordinator.subscribe();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);

        let cart = f.coordinator.add_to_cart(ProductId::new(42), 1).await.unwrap();
        assert_eq!(cart.item_count, 1);
        assert!(matches!(events.recv().await.unwrap(), CartEvent::Updated(_)));
        assert!(matches!(events.recv().await.unwrap(), CartEvent::OpenCart));
    }

    #[tokio::test]
    async fn test_zero_quantity_never_sent() {
        let f = fixture();
        let err = f
            .coordinator
            .update_quantity(&LineKey::new("k1"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity));
        assert!(f.coordinator.add_to_cart(ProductId::new(1), 0).await.is_err());
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_snapshot() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.transport.push_status(
            400,
            r#"{"code":"woocommerce_rest_product_out_of_stock","message":"Sold out","data":{"status":400}}"#
                .to_string(),
        );

        let before = f.coordinator.refresh().await.unwrap();
        let err = f
            .coordinator
            .add_to_cart(ProductId::new(7), 1)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Sold out");
        assert_eq!(f.coordinator.snapshot(), Some(before));
    }

    #[tokio::test]
    async fn test_superseded_update_is_not_applied() {
        let f = fixture();
        f.transport.set_delay(Duration::from_millis(20));
        f.transport.push_ok(cart_json(&[("k1", 42, 2)]), None, None);
        f.transport.push_ok(cart_json(&[("k1", 42, 3)]), None, None);

        let key = LineKey::new("k1");
        let (first, second) = tokio::join!(
            f.coordinator.update_quantity(&key, 2),
            f.coordinator.update_quantity(&key, 3),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first, second);
        // Only the response to the latest request for the line sticks
        assert_eq!(f.coordinator.snapshot(), Some(second));
        assert!(f.coordinator.pending(&key).is_none());
    }

    #[tokio::test]
    async fn test_clear_drops_snapshot_and_credentials() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.coordinator.refresh().await.unwrap();

        f.coordinator.clear();
        assert!(f.coordinator.snapshot().is_none());
        assert_eq!(f.store.load(), SessionCredentials::default());
        assert_eq!(f.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_checkout_empty_cart_is_noop() {
        let f = fixture();
        assert!(f.coordinator.sync_checkout().is_none());

        f.transport.push_ok(cart_json(&[]), None, None);
        f.coordinator.refresh().await.unwrap();
        assert!(f.coordinator.sync_checkout().is_none());
        assert!(f.store.load().cart_token.is_some());
    }

    #[tokio::test]
    async fn test_sync_checkout_hands_off() {
        let f = fixture();
        let mut events = f.coordinator.subscribe();
        f.transport
            .push_ok(cart_json(&[("k1", 42, 2), ("k2", 51, 1)]), None, None);
        f.coordinator.refresh().await.unwrap();

        let url = f.coordinator.sync_checkout().unwrap();
        assert_eq!(url.query(), Some("rooh_sync_cart=42%3A2%2C51%3A1"));
        assert_eq!(f.store.load(), SessionCredentials::default());

        assert!(matches!(events.recv().await.unwrap(), CartEvent::Updated(_)));
        assert!(matches!(events.recv().await.unwrap(), CartEvent::Cleared));
        match events.recv().await.unwrap() {
            CartEvent::Navigate(target) => assert_eq!(target, url),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.transport.push_ok(
            r#"{"order_id": 9, "status": "failed", "payment_result": {"payment_status": "failure",
                "payment_details": [{"key": "errorMessage", "value": "Card declined"}]}}"#
                .to_string(),
            None,
            None,
        );
        f.coordinator.refresh().await.unwrap();

        let err = f.coordinator.place_order(&checkout_request()).await.unwrap_err();
        assert_eq!(err.user_message(), "Card declined");
        assert_eq!(f.coordinator.snapshot().unwrap().item_count, 1);
        assert!(f.store.load().cart_token.is_some());
    }

    #[tokio::test]
    async fn test_completed_order_resets_session() {
        let f = fixture();
        f.transport.push_ok(
            r#"{"order_id": 9, "status": "processing", "payment_result": {"payment_status": "success"}}"#
                .to_string(),
            None,
            None,
        );
        f.transport.push_ok(cart_json(&[]), Some("tok2"), Some("n2"));

        let outcome = f.coordinator.place_order(&checkout_request()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Complete);
        assert!(f.coordinator.snapshot().unwrap().is_empty());

        let sent = f.transport.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].cart_token.is_none());
        assert_eq!(f.store.load().cart_token.unwrap().as_str(), "tok2");
    }

    fn pending_order_json() -> String {
        r#"{"order_id": 9, "status": "pending", "payment_result": {"payment_status": "pending",
            "payment_details": [{"key": "clientSecret", "value": "pi_secret"}]}}"#
            .to_string()
    }

    #[tokio::test]
    async fn test_pending_confirmation_keeps_session_and_cart() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.transport.push_ok(pending_order_json(), None, None);
        f.coordinator.refresh().await.unwrap();

        let outcome = f.coordinator.place_order(&checkout_request()).await.unwrap();

        assert_eq!(
            outcome,
            PaymentOutcome::RequiresAction {
                client_secret: Some("pi_secret".to_string())
            }
        );
        assert_eq!(f.transport.requests().len(), 2);
        assert_eq!(f.store.load().cart_token.unwrap().as_str(), "tok");
        assert_eq!(f.coordinator.snapshot().unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_confirmed_order_completes_after_pending() {
        let f = fixture();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.transport.push_ok(pending_order_json(), None, None);
        f.transport.push_ok(cart_json(&[]), Some("tok2"), Some("n2"));
        f.coordinator.refresh().await.unwrap();
        f.coordinator.place_order(&checkout_request()).await.unwrap();

        let fresh = f.coordinator.complete_order().await.unwrap();

        assert!(fresh.is_empty());
        assert!(f.transport.requests()[2].cart_token.is_none());
        assert_eq!(f.store.load().cart_token.unwrap().as_str(), "tok2");
    }

    #[tokio::test]
    async fn test_redirect_navigates_without_dropping_session() {
        let f = fixture();
        let mut events = f.coordinator.subscribe();
        f.transport.push_ok(cart_json(&[("k1", 42, 1)]), None, None);
        f.transport.push_ok(
            r#"{"order_id": 9, "status": "pending", "payment_result": {"payment_status": "success",
                "redirect_url": "https://pay.example.com/3ds?order=9"}}"#
                .to_string(),
            None,
            None,
        );
        f.coordinator.refresh().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), CartEvent::Updated(_)));

        let outcome = f.coordinator.place_order(&checkout_request()).await.unwrap();

        assert_eq!(
            outcome,
            PaymentOutcome::Redirect("https://pay.example.com/3ds?order=9".to_string())
        );
        match events.recv().await.unwrap() {
            CartEvent::Navigate(url) => assert_eq!(url.host_str(), Some("pay.example.com")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(f.transport.requests().len(), 2);
        assert_eq!(f.store.load().cart_token.unwrap().as_str(), "tok");
        assert_eq!(f.coordinator.snapshot().unwrap().item_count, 1);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = CartError::Api(StoreApiError::Api {
            status: 500,
            code: "internal".to_string(),
            message: "SQL error near ...".to_string(),
        });
        assert_eq!(err.user_message(), CartError::GENERIC_MESSAGE);
    }
}
