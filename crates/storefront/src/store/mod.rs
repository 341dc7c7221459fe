//! Durable key-value storage.
//!
//! # Contract
//!
//! A [`DurableStore`] is an opaque string-keyed store of string values:
//!
//! - `save(key, value)` replaces the value under `key`
//! - `load(key)` returns `None` when the key is absent
//! - `remove(key)` deletes one key (absent keys are not an error)
//! - `clear()` deletes every key owned by the store
//!
//! Single-key operations are atomic. There is no atomicity across keys and no
//! transaction support; every state container owns exactly one key.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, used by tests and ephemeral sessions
//! - [`FileStore`] - one JSON file per key inside a data directory

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`DurableStore`] backend.
///
/// Cloneable so that a failed background save can be reported both to the
/// log and to whoever awaits the next flush.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A value could not be encoded for storage.
    #[error("serialization error for key '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Backend-specific failure (unavailable, quota exceeded, injected fault).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_owned(),
            source: Arc::new(source),
        }
    }
}

/// The storage trait every state container persists through.
///
/// Implementations must be `Debug + Send + Sync + 'static` so they can be shared as
/// `Arc<dyn DurableStore>` with the background persistence tasks.
#[async_trait]
pub trait DurableStore: std::fmt::Debug + Send + Sync + 'static {
    /// Replace the value stored under `key`.
    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value stored under `key`, or `None` if the key is absent.
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every key held by this store.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// The logical key namespace. Keys must never collide between containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Stock levels per warehouse.
    Stocks,
    /// Sales transaction log.
    Transactions,
    /// Delivery subscriptions.
    Subscriptions,
    /// Customer registry.
    Customers,
    /// Reserved for usage analytics; no container writes it yet.
    Analytics,
    /// Light/dark theme preference.
    ThemePreference,
    /// The shopping cart.
    Cart,
}

impl StorageKey {
    /// Every known key.
    pub const ALL: [Self; 7] = [
        Self::Stocks,
        Self::Transactions,
        Self::Subscriptions,
        Self::Customers,
        Self::Analytics,
        Self::ThemePreference,
        Self::Cart,
    ];

    /// The key string used in the durable store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Transactions => "transactions",
            Self::Subscriptions => "subscriptions",
            Self::Customers => "customers",
            Self::Analytics => "analytics",
            Self::ThemePreference => "theme_preference",
            Self::Cart => "@torodofarms_cart",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
