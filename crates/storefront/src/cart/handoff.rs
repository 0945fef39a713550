//! Checkout handoff to the server-rendered checkout.
//!
//! The store's checkout page rebuilds the cart from a single query parameter
//! (`?rooh_sync_cart=42:2,51:1`) and takes over from there.

use rooh_core::{CartSnapshot, ProductId};
use url::Url;

use crate::config::StoreConfig;

/// Where and how to hand the cart over.
#[derive(Debug, Clone)]
pub struct HandoffTarget {
    base_url: Url,
    param: String,
}

impl HandoffTarget {
    #[must_use]
    pub fn new(base_url: Url, param: impl Into<String>) -> Self {
        Self {
            base_url,
            param: param.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.base_url.clone(), config.cart_sync_param.clone())
    }

    /// Handoff URL for `cart`, or `None` when the cart is empty.
    #[must_use]
    pub fn url_for(&self, cart: &CartSnapshot) -> Option<Url> {
        if cart.is_empty() {
            return None;
        }
        let encoded = urlencoding::encode(&encode_lines(&cart.product_quantities())).into_owned();
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!("{}={encoded}", self.param)));
        Some(url)
    }
}

/// `id:qty` pairs joined by commas, in line order.
#[must_use]
pub fn encode_lines(lines: &[(ProductId, u32)]) -> String {
    lines
        .iter()
        .map(|(product_id, quantity)| format!("{product_id}:{quantity}"))
        .collect::<Vec<_>>()
        .join(",")
}
