//! Per-key serialized persistence.
//!
//! Each state container owns one [`Persister`]. Scheduling a save replaces the
//! pending value in a `watch` channel; a background task saves whatever value
//! is newest when it gets to run. Consequently:
//!
//! - at most one `save` per key is in flight at any time
//! - values superseded before their turn are never written
//! - the stored value converges to the last scheduled value
//!
//! Failed saves are retried with exponential backoff. A retry is abandoned as
//! soon as a newer value is pending, because that value replaces it anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::capture_storage_error;
use crate::store::{DurableStore, StoreError, StorageKey};

/// Retry policy for background saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
}

impl PersistPolicy {
    /// Default number of retries.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Default delay before the first retry.
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

    /// Backoff before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            base_delay: Self::DEFAULT_BASE_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    generation: u64,
    payload: Arc<str>,
}

#[derive(Debug, Clone, Default)]
struct Ack {
    generation: u64,
    error: Option<StoreError>,
}

enum SaveOutcome {
    Saved,
    Superseded,
    Failed(StoreError),
}

/// Handle to the background writer for one storage key.
#[derive(Debug)]
pub(crate) struct Persister {
    key: StorageKey,
    pending: watch::Sender<Option<Pending>>,
    acked: watch::Receiver<Ack>,
    generation: u64,
}

impl Persister {
    /// Spawn the writer task. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(store: Arc<dyn DurableStore>, key: StorageKey, policy: PersistPolicy) -> Self {
        let (pending_tx, pending_rx) = watch::channel(None);
        let (ack_tx, ack_rx) = watch::channel(Ack::default());
        tokio::spawn(write_loop(store, key, policy, pending_rx, ack_tx));

        Self {
            key,
            pending: pending_tx,
            acked: ack_rx,
            generation: 0,
        }
    }

    /// Queue `payload` as the newest value for this key.
    pub(crate) fn schedule(&mut self, payload: String) {
        self.generation += 1;
        self.pending.send_replace(Some(Pending {
            generation: self.generation,
            payload: payload.into(),
        }));
        debug!(key = %self.key, generation = self.generation, "Save scheduled");
    }

    /// Wait until the newest scheduled value has been written or given up on.
    pub(crate) async fn flush(&self) -> Result<(), StoreError> {
        let target = self.generation;
        if target == 0 {
            return Ok(());
        }

        let mut acked = self.acked.clone();
        let outcome = acked
            .wait_for(|ack| ack.generation >= target)
            .await
            .map(|ack| ack.error.clone())
            .map_err(|_| StoreError::Backend(format!("persister for '{}' stopped", self.key)))?;

        outcome.map_or(Ok(()), Err)
    }
}

async fn write_loop(
    store: Arc<dyn DurableStore>,
    key: StorageKey,
    policy: PersistPolicy,
    mut pending: watch::Receiver<Option<Pending>>,
    ack: watch::Sender<Ack>,
) {
    while pending.changed().await.is_ok() {
        let Some(next) = pending.borrow_and_update().clone() else {
            continue;
        };

        match save_with_retry(store.as_ref(), key, &policy, &next, &pending).await {
            SaveOutcome::Saved => {
                ack.send_replace(Ack {
                    generation: next.generation,
                    error: None,
                });
            }
            SaveOutcome::Superseded => {
                debug!(key = %key, generation = next.generation, "Save superseded by newer value");
            }
            SaveOutcome::Failed(err) => {
                capture_storage_error(key, &err);
                ack.send_replace(Ack {
                    generation: next.generation,
                    error: Some(err),
                });
            }
        }
    }
    debug!(key = %key, "Persister stopped");
}

async fn save_with_retry(
    store: &dyn DurableStore,
    key: StorageKey,
    policy: &PersistPolicy,
    next: &Pending,
    pending: &watch::Receiver<Option<Pending>>,
) -> SaveOutcome {
    let mut retry = 0;
    loop {
        match store.save(key.as_str(), &next.payload).await {
            Ok(()) => return SaveOutcome::Saved,
            Err(err) if retry >= policy.max_retries => return SaveOutcome::Failed(err),
            Err(err) => {
                retry += 1;
                let delay = policy.delay_for(retry);
                warn!(
                    key = %key,
                    generation = next.generation,
                    retry,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Save failed, retrying"
                );
                tokio::time::sleep(delay).await;
                if pending.has_changed().unwrap_or(false) {
                    return SaveOutcome::Superseded;
                }
            }
        }
    }
}
