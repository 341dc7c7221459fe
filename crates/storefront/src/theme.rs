//! Color scheme preference.

use std::sync::Arc;

use torodo_core::ThemePreference;

use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::store::{DurableStore, StorageKey, StoreError};

impl Entity for ThemePreference {
    const KEY: StorageKey = StorageKey::ThemePreference;
}

/// The theme container.
#[derive(Debug)]
pub struct Theme {
    state: StateContainer<ThemePreference>,
}

impl Theme {
    /// Open the theme container, loading any stored preference.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
        }
    }

    /// The stored preference; `System` until one is set.
    #[must_use]
    pub fn preference(&self) -> ThemePreference {
        *self.state.get()
    }

    /// Replace the preference and queue it for saving.
    pub fn set(&mut self, preference: ThemePreference) {
        self.state.replace(preference);
    }

    /// Whether dark colors apply, given the current system setting.
    #[must_use]
    pub fn is_dark(&self, system_is_dark: bool) -> bool {
        self.preference().is_dark(system_is_dark)
    }

    /// Wait for pending saves.
    ///
    /// # Errors
    ///
    /// Returns the store error if the latest save failed.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.state.flush().await
    }

    pub(crate) fn reset(&mut self) {
        self.state.reset();
    }
}
