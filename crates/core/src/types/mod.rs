//! Core types for the Rooh storefront.
//!
//! This module provides type-safe wrappers for the cart session domain.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod id;
pub mod money;
pub mod session;

pub use cart::{
    CartImage, CartLineItem, CartSnapshot, CartTotals, LineKey, LinePrices, LineTotals,
    PackageItem, ShippingPackage, ShippingRate,
};
pub use catalog::{Category, CategoryImage, CategoryRef, Product, ProductImage, StockStatus};
pub use checkout::{
    Address, BillingAddress, CheckoutRequest, OrderResult, PaymentDataEntry, PaymentMethod,
    PaymentOutcome, PaymentResult, ShippingAddressUpdate,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Currency, IntoMinorUnits, Money, MoneyError, format_money};
pub use session::{
    ActiveSession, CartToken, CredentialUpdate, DEFAULT_NONCE_TTL_SECS, IssuedNonce, Nonce,
    SessionCredentials, StoredSession,
};
