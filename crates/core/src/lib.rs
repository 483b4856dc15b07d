//! Pizzeria Core - Shared types library.
//!
//! This crate provides common types used across all Pizzeria components:
//! - `storefront` - Client state-synchronization engine (cart, ratings,
//!   favorites, order history and the admin ledger)
//! - `cli` - Command-line tools for operators
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, money formatting, and the order status taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
