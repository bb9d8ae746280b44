//! The key-value blob store contract and its in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::StorageError;

/// A durable key-value store of opaque byte blobs.
///
/// Writes replace the whole blob.  Implementations must be usable from any
/// thread; callers serialize access to a given key themselves.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if nothing was written yet.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Delete the blob under `key`.  Returns `false` if there was none.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

impl<B: BlobStore + ?Sized> BlobStore for Arc<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}

/// Keys become file names in [`crate::FileBlobStore`], so they are limited to
/// ASCII letters, digits, `-`, `_` and `.`, and may not start with a dot.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}

/// In-memory [`BlobStore`].
///
/// Clones share the same underlying map, which makes it a convenient fake
/// in tests: hand one clone to the code under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        self.lock().insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let store = MemoryBlobStore::new();
        let observer = store.clone();

        store.write("campaigns", b"[]").unwrap();
        assert_eq!(observer.read("campaigns").unwrap().as_deref(), Some(&b"[]"[..]));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryBlobStore::new();
        assert!(store.read("nothing").unwrap().is_none());
        assert!(!store.remove("nothing").unwrap());
    }

    #[test]
    fn write_replaces_previous_blob() {
        let store = MemoryBlobStore::new();
        store.write("k", b"one").unwrap();
        store.write("k", b"two").unwrap();
        assert_eq!(store.read("k").unwrap().unwrap(), b"two");
        assert!(store.remove("k").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let store = MemoryBlobStore::new();
        for key in ["", "../etc", ".hidden", "a/b", "a\\b"] {
            assert!(
                matches!(store.write(key, b"x"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
