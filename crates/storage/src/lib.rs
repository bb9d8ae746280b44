//! `storage` crate: pure persistence layer.
//!
//! Provides a key-value [`BlobStore`] abstraction, an in-memory and a
//! file-backed implementation, and the versioned JSON envelope every
//! persisted document is wrapped in.  No domain types live here.

pub mod error;
pub mod blob;
pub mod file;
pub mod codec;

pub use blob::{BlobStore, MemoryBlobStore};
pub use codec::{decode_versioned, encode_versioned, Envelope};
pub use error::StorageError;
pub use file::FileBlobStore;
