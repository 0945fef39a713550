//! Cart coordinator end to end against the mock store.
//!
//! Run with: cargo test -p rooh-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rooh_core::{
    Address, BillingAddress, CheckoutRequest, Email, LineKey, PaymentOutcome, ProductId,
    ShippingAddressUpdate,
};
use rooh_integration_tests::{DECLINING_METHOD, MockStoreApi, OUT_OF_STOCK_ID};
use rooh_storefront::cart::{CartError, CartEvent};
use rooh_storefront::session::{MemorySessionStore, SessionStore};
use rooh_storefront::state::Storefront;

struct Harness {
    server: MockStoreApi,
    store: Arc<MemorySessionStore>,
    storefront: Storefront,
}

async fn harness() -> Harness {
    let server = MockStoreApi::start().await.unwrap();
    let store = Arc::new(MemorySessionStore::new());
    let storefront = Storefront::with_store(server.config().unwrap(), Arc::clone(&store) as _).unwrap();
    Harness {
        server,
        store,
        storefront,
    }
}

fn checkout_request(payment_method: &str) -> CheckoutRequest {
    let address = Address {
        first_name: "Noor".to_string(),
        last_name: "Saleh".to_string(),
        address_1: "12 Creek Rd".to_string(),
        city: "Dubai".to_string(),
        country: "AE".to_string(),
        ..Address::default()
    };
    CheckoutRequest {
        billing_address: BillingAddress {
            address: address.clone(),
            email: Email::parse("noor@example.com").unwrap(),
            phone: "555-0142".to_string(),
        },
        shipping_address: address,
        payment_method: payment_method.to_string(),
        payment_data: Vec::new(),
    }
}

#[tokio::test]
async fn test_add_update_remove_round() {
    let h = harness().await;
    let cart = h.storefront.cart();
    let mut events = cart.subscribe();

    let added = cart.add_to_cart(ProductId::new(42), 2).await.unwrap();
    assert_eq!(added.item_count, 2);
    assert!(added.is_consistent());
    assert!(matches!(events.recv().await.unwrap(), CartEvent::Updated(_)));
    assert!(matches!(events.recv().await.unwrap(), CartEvent::OpenCart));

    let key = LineKey::new("key-42");
    let updated = cart.update_quantity(&key, 5).await.unwrap();
    assert_eq!(updated.line(&key).unwrap().quantity, 5);
    assert_eq!(cart.view().total, "$55.00");

    let removed = cart.remove_item(&key).await.unwrap();
    assert!(removed.is_empty());
    assert_eq!(h.server.server_quantity(), 0);
    assert!(!cart.is_busy());
    assert!(cart.pending(&key).is_none());
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(51), 1).await.unwrap();

    let first = cart.refresh().await.unwrap();
    let second = cart.refresh().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(cart.snapshot(), Some(second));
}

#[tokio::test]
async fn test_zero_quantity_never_reaches_server() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(42), 1).await.unwrap();
    let before = h.server.mutations().len();

    let err = cart
        .update_quantity(&LineKey::new("key-42"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity));
    let err = cart.add_to_cart(ProductId::new(42), 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity));

    assert_eq!(h.server.mutations().len(), before);
}

#[tokio::test]
async fn test_server_rejection_keeps_last_snapshot() {
    let h = harness().await;
    let cart = h.storefront.cart();
    let good = cart.add_to_cart(ProductId::new(42), 1).await.unwrap();

    let err = cart
        .add_to_cart(ProductId::new(OUT_OF_STOCK_ID), 1)
        .await
        .unwrap_err();

    assert!(err.user_message().contains("out of stock"));
    assert_eq!(cart.snapshot(), Some(good));
}

#[tokio::test]
async fn test_shipping_rate_selection() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(42), 1).await.unwrap();

    let quoted = cart
        .shipping_address(&ShippingAddressUpdate::country("AE"))
        .await
        .unwrap();
    let package = &quoted.shipping_packages[0];
    assert_eq!(package.selected_rate().unwrap().rate_id, "flat_rate:1");

    let chosen = cart
        .select_shipping_rate(package.package_id, "local_pickup:2")
        .await
        .unwrap();
    assert_eq!(
        chosen.shipping_packages[0].selected_rate().unwrap().rate_id,
        "local_pickup:2"
    );
}

#[tokio::test]
async fn test_handoff_encodes_lines_and_ends_session() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(42), 2).await.unwrap();
    cart.add_to_cart(ProductId::new(51), 1).await.unwrap();

    let url = cart.sync_checkout().unwrap();

    assert_eq!(url.query(), Some("rooh_sync_cart=42%3A2%2C51%3A1"));
    assert!(cart.snapshot().is_none());
    assert!(h.store.load().cart_token.is_none());
}

#[tokio::test]
async fn test_handoff_of_empty_cart_is_noop() {
    let h = harness().await;
    let cart = h.storefront.cart();
    assert!(cart.sync_checkout().is_none());

    cart.refresh().await.unwrap();
    assert!(cart.sync_checkout().is_none());
    assert!(h.store.load().cart_token.is_some());
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(42), 1).await.unwrap();

    let err = cart
        .place_order(&checkout_request(DECLINING_METHOD))
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Payment(ref message) if message == "Your card was declined."));
    assert_eq!(h.store.load().cart_token.unwrap().as_str(), "tok-1");
    assert_eq!(h.server.server_quantity(), 1);
}

#[tokio::test]
async fn test_completed_order_starts_new_session() {
    let h = harness().await;
    let cart = h.storefront.cart();
    cart.add_to_cart(ProductId::new(42), 1).await.unwrap();
    let methods = cart.payment_methods().await.unwrap();
    assert_eq!(methods[0].id, "stripe");

    let outcome = cart.place_order(&checkout_request("stripe")).await.unwrap();

    assert_eq!(outcome, PaymentOutcome::Complete);
    assert!(cart.snapshot().unwrap().is_empty());
    assert_eq!(h.store.load().cart_token.unwrap().as_str(), "tok-2");
}
