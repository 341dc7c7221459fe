//! Filesystem-backed [`DurableStore`]: one JSON file per key.
//!
//! Writes go to a uniquely named temporary file in the same directory and are
//! then renamed over the target, so a crash mid-write leaves either the old or
//! the new value, never a torn one.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{DurableStore, StoreError};

const VALUE_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// A store that keeps each key in `<dir>/<encoded key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir.display().to_string(), e))?;
        debug!(dir = %dir.display(), "File store opened");
        Ok(Self { dir })
    }

    /// The directory holding the value files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{VALUE_EXTENSION}", encode_key(key)))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{TEMP_EXTENSION}",
            encode_key(key),
            uuid::Uuid::new_v4().simple()
        ))
    }
}

/// Map a key to a file stem. ASCII alphanumerics, `_` and `-` pass through;
/// every other byte becomes `%XX`, which keeps the mapping injective.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

#[async_trait]
impl DurableStore for FileStore {
    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let temp = self.temp_path(key);
        tokio::fs::write(&temp, value)
            .await
            .map_err(|e| StoreError::io(key, e))?;
        if let Err(e) = tokio::fs::rename(&temp, self.value_path(key)).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::io(key, e));
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.value_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn clear(&self) -> Result<(), StoreError> {
        let dir_key = self.dir.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&dir_key, e))?;

        let mut removed = 0_usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir_key, e))?
        {
            let path = entry.path();
            let ours = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == VALUE_EXTENSION || ext == TEMP_EXTENSION);
            if !ours {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path.display().to_string(), e)),
            }
        }

        debug!(removed, "File store cleared");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("stocks"), "stocks");
        assert_eq!(encode_key("theme_preference"), "theme_preference");
        assert_eq!(encode_key("@torodofarms_cart"), "%40torodofarms_cart");
        assert_eq!(encode_key("a/b"), "a%2Fb");
    }

    #[test]
    fn test_encode_key_is_injective_for_escape_char() {
        assert_ne!(encode_key("%40x"), encode_key("@x"));
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.load("@torodofarms_cart").await.unwrap(), None);
        store.save("@torodofarms_cart", "[]").await.unwrap();
        assert_eq!(
            store.load("@torodofarms_cart").await.unwrap().as_deref(),
            Some("[]")
        );

        // Overwrite replaces the whole value.
        store.save("@torodofarms_cart", "[1]").await.unwrap();
        assert_eq!(
            store.load("@torodofarms_cart").await.unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.remove("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_keeps_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.save("stocks", "{}").await.unwrap();
        store.save("customers", "[]").await.unwrap();
        std::fs::write(dir.path().join("README"), "keep me").unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.load("stocks").await.unwrap(), None);
        assert_eq!(store.load("customers").await.unwrap(), None);
        assert!(dir.path().join("README").exists());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).await.unwrap();
        assert!(store.dir().is_dir());
    }
}
