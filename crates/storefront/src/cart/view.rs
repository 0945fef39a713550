//! Display-ready cart data derived from a snapshot.
//!
//! Everything here is a pure function of the snapshot; nothing is recomputed
//! client-side (totals, counts and line prices all come from the server).

use rooh_core::{CartLineItem, CartSnapshot, Money};

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub key: String,
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    /// Regular price, only when the line is discounted.
    pub regular_price: Option<String>,
    pub line_price: String,
    pub image: Option<ImageView>,
}

/// Image display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub item_count: u32,
    pub needs_shipping: bool,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: "$0.00".to_string(),
            shipping: "$0.00".to_string(),
            tax: "$0.00".to_string(),
            total: "$0.00".to_string(),
            item_count: 0,
            needs_shipping: false,
        }
    }

    /// View of an optional snapshot; no snapshot renders as empty.
    #[must_use]
    pub fn from_snapshot(snapshot: Option<&CartSnapshot>) -> Self {
        snapshot.map_or_else(Self::empty, Self::from)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn format_price(money: &Money) -> String {
    money.format()
}

impl From<&CartSnapshot> for CartView {
    fn from(cart: &CartSnapshot) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            subtotal: format_price(&cart.totals.items),
            shipping: format_price(&cart.totals.shipping),
            tax: format_price(&cart.totals.tax),
            total: format_price(&cart.totals.total),
            item_count: cart.item_count,
            needs_shipping: cart.needs_shipping,
        }
    }
}

impl From<&CartLineItem> for CartItemView {
    fn from(line: &CartLineItem) -> Self {
        Self {
            key: line.key.to_string(),
            product_id: line.product_id.as_i64(),
            name: line.name.clone(),
            quantity: line.quantity,
            price: format_price(&line.prices.price),
            regular_price: line
                .prices
                .on_sale()
                .then(|| format_price(&line.prices.regular_price)),
            line_price: format_price(&line.totals.total),
            image: line.primary_image().map(|img| ImageView {
                url: if img.thumbnail.is_empty() {
                    img.src.clone()
                } else {
                    img.thumbnail.clone()
                },
                alt: img.alt.clone(),
            }),
        }
    }
}
