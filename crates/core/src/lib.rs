//! Rooh Core - Shared types library.
//!
//! This crate provides the types shared by every Rooh component:
//! - `storefront` - Store API client, cart session layer, catalog client
//! - `integration-tests` - Mock Store API and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Anything time-dependent takes `now` as a parameter so
//! callers (and tests) decide what "now" is.
//!
//! # Modules
//!
//! - [`types`] - IDs, money, cart snapshots, session credentials, checkout
//!   and catalog types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
