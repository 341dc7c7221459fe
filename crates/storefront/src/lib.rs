//! Torodo storefront state core.
//!
//! In-memory state containers for the cart, stock, customers, subscriptions,
//! sales and theme, each mirrored into one key of a durable string store.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use torodo_storefront::catalog::SizeVariant;
//! use torodo_storefront::clock::SystemClock;
//! use torodo_storefront::container::PersistPolicy;
//! use torodo_storefront::services::auth::MemoryIdentityProvider;
//! use torodo_storefront::state::AppState;
//! use torodo_storefront::store::MemoryStore;
//!
//! # async fn demo() -> torodo_storefront::error::Result<()> {
//! let mut app = AppState::open(
//!     Arc::new(MemoryStore::new()),
//!     PersistPolicy::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(MemoryIdentityProvider::new()),
//! )
//! .await;
//!
//! app.cart.add_line("milk", "Lait Frais", SizeVariant::new(1, 1000), 2)?;
//! let sale = app.checkout(None)?;
//! assert_eq!(sale.total.to_string(), "2000 CFA");
//! app.flush_all().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod container;
pub mod customers;
pub mod error;
pub mod sales;
pub mod services;
pub mod state;
pub mod stock;
pub mod store;
pub mod subscriptions;
pub mod theme;
