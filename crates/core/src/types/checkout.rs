//! Checkout request and order result types.
//!
//! These mirror the Store API `/cart/update-customer`, `/payment-methods` and
//! `/checkout` payloads closely enough to be serialized directly.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::OrderId;

/// A full postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Billing address with the contact details checkout requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    #[serde(flatten)]
    pub address: Address,
    pub email: Email,
    pub phone: String,
}

/// Partial shipping address sent to recompute shipping rates.
///
/// Only the country is required; the server quotes rates from whatever is
/// supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    pub country: String,
}

impl ShippingAddressUpdate {
    /// An update carrying only the destination country.
    #[must_use]
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }
}

/// A payment gateway offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A key/value pair passed to or returned from a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDataEntry {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl PaymentDataEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Body of `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub billing_address: BillingAddress,
    pub shipping_address: Address,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_data: Vec<PaymentDataEntry>,
}

/// Gateway-specific result of a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub payment_details: Vec<PaymentDataEntry>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl PaymentResult {
    /// Look up a detail by key.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.payment_details
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}

/// Response of `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub order_key: String,
    #[serde(default)]
    pub payment_result: PaymentResult,
}

/// What the caller has to do after a checkout response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The gateway wants a full navigation (e.g. 3-D Secure or hosted page).
    Redirect(String),
    /// The payment needs customer confirmation before the order completes.
    RequiresAction { client_secret: Option<String> },
    /// The gateway declined; the cart is still intact.
    Failed { message: String },
    /// The order was placed.
    Complete,
}

impl PaymentOutcome {
    pub const DEFAULT_FAILURE_MESSAGE: &'static str = "Payment failed. Please try again.";
}

impl OrderResult {
    /// Classify the payment result.
    ///
    /// A non-empty redirect wins over everything else, then an explicit
    /// `failure`, then `pending`/`requires_action`.
    #[must_use]
    pub fn outcome(&self) -> PaymentOutcome {
        let result = &self.payment_result;

        if let Some(url) = result.redirect_url.as_deref().filter(|url| !url.is_empty()) {
            return PaymentOutcome::Redirect(url.to_string());
        }

        match result.payment_status.as_str() {
            "failure" | "error" => PaymentOutcome::Failed {
                message: result
                    .detail("errorMessage")
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or(PaymentOutcome::DEFAULT_FAILURE_MESSAGE)
                    .to_string(),
            },
            "pending" | "requires_action" => PaymentOutcome::RequiresAction {
                client_secret: result.detail("clientSecret").map(str::to_string),
            },
            _ => PaymentOutcome::Complete,
        }
    }
}
