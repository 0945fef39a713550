//! Rooh storefront cart session and synchronization layer.
//!
//! Keeps a server-side WooCommerce cart in sync with the storefront over the
//! stateless Store API, using a cart token paired with a short-lived nonce.
//!
//! - [`session`] persists credentials and bootstraps new sessions
//! - [`store_api`] talks to the Store API and recovers from nonce expiry
//! - [`cart`] owns the cart snapshot the UI renders
//! - [`catalog`] reads products and categories from the REST API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod session;
pub mod state;
pub mod store_api;
