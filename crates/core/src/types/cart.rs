//! Server-authoritative cart snapshot.
//!
//! A [`CartSnapshot`] is the full state of the server-side cart at one point
//! in time. It is replaced wholesale after every successful round trip and
//! never patched on the client, so tax and shipping recalculations done by
//! the server can never drift from what is displayed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{ImageId, PackageId, ProductId};
use super::money::{Currency, Money};

/// Opaque identifier of one cart line.
///
/// Distinct from the product ID: the same product can appear on several
/// lines with different options or pricing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Image attached to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartImage {
    pub id: ImageId,
    pub src: String,
    pub thumbnail: String,
    pub alt: String,
}

/// Per-unit prices of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrices {
    pub price: Money,
    pub regular_price: Money,
    pub sale_price: Money,
}

impl LinePrices {
    /// True when the line is currently discounted.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.sale_price.minor_units < self.regular_price.minor_units
    }
}

/// Line totals as computed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    /// Before coupons.
    pub subtotal: Money,
    /// After coupons.
    pub total: Money,
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub key: LineKey,
    pub product_id: ProductId,
    pub name: String,
    /// Always at least 1.
    pub quantity: u32,
    pub prices: LinePrices,
    pub totals: LineTotals,
    pub images: Vec<CartImage>,
    pub short_description: String,
}

impl CartLineItem {
    /// The first image, used as the line thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&CartImage> {
        self.images.first()
    }
}

/// Aggregate cart totals, all in the cart currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub items: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl CartTotals {
    /// All-zero totals in `currency`.
    #[must_use]
    pub fn zero(currency: &Currency) -> Self {
        Self {
            items: Money::zero(currency.clone()),
            shipping: Money::zero(currency.clone()),
            tax: Money::zero(currency.clone()),
            total: Money::zero(currency.clone()),
        }
    }
}

/// An item inside a shipping package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageItem {
    pub key: LineKey,
    pub name: String,
    pub quantity: u32,
}

/// A selectable shipping rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub rate_id: String,
    pub name: String,
    pub price: Money,
    pub selected: bool,
}

/// A shipping package and its available rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPackage {
    pub package_id: PackageId,
    pub name: String,
    pub destination: BTreeMap<String, String>,
    pub items: Vec<PackageItem>,
    pub rates: Vec<ShippingRate>,
}

impl ShippingPackage {
    /// The rate the server currently has selected for this package.
    #[must_use]
    pub fn selected_rate(&self) -> Option<&ShippingRate> {
        self.rates.iter().find(|rate| rate.selected)
    }
}

/// Full state of the server-side cart at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    /// Server-reported; equals the sum of line quantities.
    pub item_count: u32,
    pub totals: CartTotals,
    pub needs_shipping: bool,
    pub shipping_packages: Vec<ShippingPackage>,
}

impl CartSnapshot {
    /// An empty cart in `currency`.
    #[must_use]
    pub fn empty(currency: &Currency) -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
            totals: CartTotals::zero(currency),
            needs_shipping: false,
            shipping_packages: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by key.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn quantity_sum(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether the server-reported item count matches the lines.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        u64::from(self.item_count) == self.quantity_sum()
    }

    /// `(product, quantity)` pairs in line order, for rebuilding the cart
    /// elsewhere.
    #[must_use]
    pub fn product_quantities(&self) -> Vec<(ProductId, u32)> {
        self.items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect()
    }
}
