//! Integration tests for the Torodo storefront core.
//!
//! Every test runs against a [`FileStore`] in a fresh temporary directory,
//! so values go through the same files a real data directory would hold.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p torodo-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use torodo_storefront::clock::FixedClock;
use torodo_storefront::container::PersistPolicy;
use torodo_storefront::services::auth::MemoryIdentityProvider;
use torodo_storefront::state::AppState;
use torodo_storefront::store::{FileStore, StoreError};

/// A temporary data directory plus the clock every opened state shares.
#[derive(Debug)]
pub struct TestContext {
    dir: TempDir,
    pub clock: Arc<FixedClock>,
}

impl TestContext {
    /// Create an empty data directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            clock: Arc::new(FixedClock::new(Self::start())),
        })
    }

    /// The instant the test clock starts at.
    #[must_use]
    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Open application state over the data directory, as a fresh process would.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be opened.
    pub async fn open(&self) -> Result<AppState, StoreError> {
        let store = FileStore::open(self.dir.path()).await?;
        Ok(AppState::open(
            Arc::new(store),
            Self::policy(),
            self.clock.clone(),
            Arc::new(MemoryIdentityProvider::new()),
        )
        .await)
    }

    /// Write a raw value file, bypassing the containers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn write_raw(&self, file_name: &str, contents: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(file_name), contents)
    }

    /// Read a raw value file, if present.
    #[must_use]
    pub fn read_raw(&self, file_name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(file_name)).ok()
    }

    /// Short retry delays keep failing-save tests fast.
    #[must_use]
    pub const fn policy() -> PersistPolicy {
        PersistPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(5),
        }
    }
}
