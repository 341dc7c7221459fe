//! Generic entity state container.
//!
//! A [`StateContainer`] keeps one entity value in memory and mirrors it,
//! one way, into a single key of a [`DurableStore`]:
//!
//! 1. [`StateContainer::initialize`] loads the key once. A missing key, an
//!    unreadable value or a failing store all yield the entity's default;
//!    none of them is fatal.
//! 2. [`StateContainer::update`] applies a mutation to a copy of the value.
//!    If the mutation fails the value is untouched; otherwise the copy
//!    replaces it and the whole new value is queued for saving.
//! 3. Saves are serialized per key by the [`Persister`]; see that module.
//!
//! Mutations made before the initial load completes are kept in memory but
//! not persisted. If the load then finds a stored value, the stored value
//! wins; if it finds nothing, the in-memory value is saved.
//!
//! # Stored format
//!
//! ```json
//! {"schemaVersion": 1, "data": <entity>}
//! ```
//!
//! Bare values without the envelope (as written by older app versions)
//! are accepted on load.

mod persister;

pub use persister::PersistPolicy;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, capture_storage_error};
use crate::store::{DurableStore, StorageKey, StoreError};
use persister::Persister;

/// Current version of the persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// An entity family that lives under one storage key.
pub trait Entity:
    Serialize + DeserializeOwned + Default + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// The key this entity is stored under.
    const KEY: StorageKey;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, E> {
    schema_version: u32,
    data: &'a E,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema_version: u32,
    data: serde_json::Value,
}

/// Encode a value in the versioned envelope.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the value cannot be encoded.
pub fn encode<E: Entity>(value: &E) -> std::result::Result<String, StoreError> {
    serde_json::to_string(&EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        data: value,
    })
    .map_err(|e| StoreError::Serialization {
        key: E::KEY.as_str().to_owned(),
        message: e.to_string(),
    })
}

/// Decode a stored value, with or without the envelope.
///
/// # Errors
///
/// Returns the JSON error if the value does not match the entity shape.
pub fn decode<E: Entity>(raw: &str) -> std::result::Result<E, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let is_envelope = value
        .as_object()
        .is_some_and(|map| map.contains_key("schemaVersion") && map.contains_key("data"));
    if !is_envelope {
        return serde_json::from_value(value);
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    if envelope.schema_version > SCHEMA_VERSION {
        warn!(
            key = %E::KEY,
            stored = envelope.schema_version,
            supported = SCHEMA_VERSION,
            "Stored value has a newer schema, reading best-effort"
        );
    }
    serde_json::from_value(envelope.data)
}

/// In-memory mirror of one entity, synchronized to the durable store.
#[derive(Debug)]
pub struct StateContainer<E: Entity> {
    value: E,
    ready: bool,
    unsaved: bool,
    store: Arc<dyn DurableStore>,
    persister: Persister,
}

impl<E: Entity> StateContainer<E> {
    /// Create a container holding the default value. Nothing is loaded yet.
    ///
    /// Must be called from within a Tokio runtime (it spawns the writer task).
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, policy: PersistPolicy) -> Self {
        let persister = Persister::spawn(store.clone(), E::KEY, policy);
        Self {
            value: E::default(),
            ready: false,
            unsaved: false,
            store,
            persister,
        }
    }

    /// Create a container and run the initial load.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy) -> Self {
        let mut container = Self::new(store, policy);
        container.initialize().await;
        container
    }

    /// Load the stored value once. Subsequent calls do nothing.
    #[instrument(skip(self), fields(key = %E::KEY))]
    pub async fn initialize(&mut self) {
        if self.ready {
            return;
        }

        match self.store.load(E::KEY.as_str()).await {
            Ok(Some(raw)) => match decode::<E>(&raw) {
                Ok(stored) => {
                    if self.unsaved {
                        warn!("Stored value replaces changes made before the initial load");
                        self.unsaved = false;
                    }
                    self.value = stored;
                    debug!("Loaded stored value");
                }
                Err(e) => warn!(error = %e, "Stored value is unreadable, starting from default"),
            },
            Ok(None) => debug!("No stored value, starting from default"),
            Err(e) => warn!(error = %e, "Load failed, starting from default"),
        }

        self.ready = true;
        if self.unsaved {
            self.unsaved = false;
            self.persist();
        }
    }

    /// Whether the initial load has completed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// The current in-memory value.
    #[must_use]
    pub const fn get(&self) -> &E {
        &self.value
    }

    /// Apply a mutation atomically.
    ///
    /// `mutate` works on a copy; on `Err` the copy is discarded and the
    /// current value is unchanged. On `Ok` the copy becomes the current value
    /// and is queued for saving.
    ///
    /// # Errors
    ///
    /// Returns whatever `mutate` returns.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut E) -> Result<R>) -> Result<R> {
        let mut next = self.value.clone();
        let out = mutate(&mut next)?;
        self.value = next;
        self.commit();
        Ok(out)
    }

    /// Replace the whole value.
    pub fn replace(&mut self, value: E) {
        self.value = value;
        self.commit();
    }

    /// Reset to the default value without saving.
    ///
    /// Used after the store itself was cleared.
    pub fn reset(&mut self) {
        self.value = E::default();
        self.unsaved = false;
    }

    /// Wait until the current value has been persisted.
    ///
    /// # Errors
    ///
    /// Returns the store error if the newest save failed after all retries.
    pub async fn flush(&self) -> std::result::Result<(), StoreError> {
        self.persister.flush().await
    }

    /// Remove this container's key from the store and reset to default.
    ///
    /// # Errors
    ///
    /// Returns the store error if a pending save or the removal fails.
    pub async fn remove(&mut self) -> std::result::Result<(), StoreError> {
        self.flush().await?;
        self.store.remove(E::KEY.as_str()).await?;
        self.reset();
        info!(key = %E::KEY, "Stored value removed");
        Ok(())
    }

    fn commit(&mut self) {
        if self.ready {
            self.persist();
        } else {
            self.unsaved = true;
        }
    }

    fn persist(&mut self) {
        match encode(&self.value) {
            Ok(payload) => self.persister.schedule(payload),
            Err(err) => capture_storage_error(E::KEY, &err),
        }
    }
}
