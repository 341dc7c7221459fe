//! Torodo Core - Shared types library.
//!
//! This crate provides common types used across all Torodo components:
//! - `storefront` - State containers for cart, stock, customers, subscriptions and sales
//! - `cli` - Back-office command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no async runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, amounts, volumes, contacts and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
