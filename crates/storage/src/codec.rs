//! Versioned JSON envelope for persisted documents.
//!
//! Documents are written as `{"version": N, ...body fields}`.  Documents
//! written before versioning existed are read as version 0 through a
//! caller-supplied legacy shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StorageError;

/// A document body tagged with its schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    #[serde(flatten)]
    pub body: T,
}

/// Serialize `body` under `version`.
pub fn encode_versioned<T: Serialize>(version: u32, body: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(&Envelope { version, body })?)
}

/// Decode a document written by [`encode_versioned`], or its unversioned
/// legacy form `L`.
///
/// Returns the version the document was written under alongside the body.
///
/// # Errors
/// - [`StorageError::Malformed`] if the bytes match neither shape.
/// - [`StorageError::UnsupportedVersion`] if the document is newer than `supported`.
pub fn decode_versioned<T, L>(bytes: &[u8], supported: u32) -> Result<(u32, T), StorageError>
where
    T: DeserializeOwned + From<L>,
    L: DeserializeOwned,
{
    let value: Value = serde_json::from_slice(bytes)?;

    let version = match value.get("version") {
        Some(v) => v.as_u64().and_then(|v| u32::try_from(v).ok()),
        None => None,
    };

    match version {
        Some(found) if found > supported => {
            Err(StorageError::UnsupportedVersion { found, supported })
        }
        Some(found) => {
            let envelope: Envelope<T> = serde_json::from_value(value)?;
            Ok((found, envelope.body))
        }
        None => {
            let legacy: L = serde_json::from_value(value)?;
            Ok((0, T::from(legacy)))
        }
    }
}
