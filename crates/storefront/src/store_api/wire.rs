//! Raw Store API cart payloads.
//!
//! Amounts arrive as minor-unit strings (`"11100"`), occasionally as numbers
//! or `null`; [`minor_units`] accepts all three. Every field the storefront
//! can live without is defaulted so a partial payload still parses.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct StoreCart {
    #[serde(default)]
    pub items: Vec<StoreCartItem>,
    #[serde(default)]
    pub items_count: u32,
    pub totals: StoreCartTotals,
    #[serde(default)]
    pub needs_shipping: bool,
    #[serde(default)]
    pub shipping_rates: Vec<StorePackage>,
}

#[derive(Debug, Deserialize)]
pub struct StoreCurrency {
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    #[serde(default = "default_minor_unit")]
    pub currency_minor_unit: u32,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

const fn default_minor_unit() -> u32 {
    2
}

#[derive(Debug, Deserialize)]
pub struct StoreCartItem {
    pub key: String,
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
    pub prices: StoreItemPrices,
    pub totals: StoreLineTotals,
    #[serde(default)]
    pub images: Vec<StoreImage>,
    #[serde(default)]
    pub short_description: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreItemPrices {
    #[serde(deserialize_with = "minor_units")]
    pub price: i64,
    #[serde(default, deserialize_with = "minor_units")]
    pub regular_price: i64,
    #[serde(default, deserialize_with = "minor_units")]
    pub sale_price: i64,
    #[serde(flatten)]
    pub currency: StoreCurrency,
}

#[derive(Debug, Deserialize)]
pub struct StoreLineTotals {
    #[serde(default, deserialize_with = "minor_units")]
    pub line_subtotal: i64,
    #[serde(default, deserialize_with = "minor_units")]
    pub line_total: i64,
    #[serde(flatten)]
    pub currency: StoreCurrency,
}

#[derive(Debug, Deserialize)]
pub struct StoreImage {
    pub id: i64,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreCartTotals {
    #[serde(default, deserialize_with = "minor_units")]
    pub total_items: i64,
    /// `null` until a shipping address is known.
    #[serde(default, deserialize_with = "minor_units")]
    pub total_shipping: i64,
    #[serde(default, deserialize_with = "minor_units")]
    pub total_tax: i64,
    #[serde(default, deserialize_with = "minor_units")]
    pub total_price: i64,
    #[serde(flatten)]
    pub currency: StoreCurrency,
}

#[derive(Debug, Deserialize)]
pub struct StorePackage {
    pub package_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub destination: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub items: Vec<StorePackageItem>,
    #[serde(default)]
    pub shipping_rates: Vec<StoreRate>,
}

#[derive(Debug, Deserialize)]
pub struct StorePackageItem {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct StoreRate {
    pub rate_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "minor_units")]
    pub price: i64,
    #[serde(default)]
    pub selected: bool,
    #[serde(flatten)]
    pub currency: StoreCurrency,
}

/// Minor-unit amount from a string, number, or `null` (zero).
fn minor_units<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("amount {n} is not an integer"))),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid minor-unit amount: {s:?}"))),
        Some(other) => Err(D::Error::custom(format!(
            "expected minor-unit amount, got {other}"
        ))),
    }
}
