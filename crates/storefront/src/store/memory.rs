//! In-process [`DurableStore`] backed by a `HashMap`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{DurableStore, StoreError};

/// A process-local store.
///
/// Besides serving as the test double for every container, it supports fault
/// injection: [`MemoryStore::fail_next_saves`] makes the next `n` saves fail,
/// and [`MemoryStore::fail_loads`] makes every load fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    saves: AtomicUsize,
    failing_saves: AtomicU32,
    failing_loads: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw values.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        store.lock().extend(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        store
    }

    /// Number of successful saves performed so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make the next `count` saves fail with a backend error.
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Make every load fail (`true`) or succeed again (`false`).
    pub fn fail_loads(&self, fail: bool) {
        self.failing_loads.store(u32::from(fail), Ordering::SeqCst);
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_injected_save_failure(&self) -> bool {
        self.failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.take_injected_save_failure() {
            return Err(StoreError::Backend(format!("injected save failure for '{key}'")));
        }
        self.lock().insert(key.to_owned(), value.to_owned());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.failing_loads.load(Ordering::SeqCst) > 0 {
            return Err(StoreError::Backend(format!("injected load failure for '{key}'")));
        }
        Ok(self.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}
