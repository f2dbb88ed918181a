//! Postcard-based cache entry encoding with versioned envelopes.
//!
//! Every cached list page is wrapped before it reaches the backend:
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (varint) │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "SCHL"              u32                postcard::to_allocvec(T)
//! ```
//!
//! A bad magic or a different schema version makes the entry unusable; the
//! cache layer evicts it and recomputes the page.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for cache entries: b"SCHL"
pub const CACHE_MAGIC: [u8; 4] = *b"SCHL";

/// Current schema version.
///
/// Increment when the shape of cached payloads changes, so entries written by
/// an older build are recomputed instead of served.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for cache entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"SCHL"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The actual cached data
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value with envelope for cache storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value from cache storage with validation.
///
/// # Errors
///
/// - `Error::DeserializationError`: Corrupted Postcard payload
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
pub fn deserialize_from_cache<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        warn!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_page_survives_envelope() {
        let page = r#"[{"id":1,"nom":"Lamy","_links":{"self":{"href":"/api/professeur/1"}}}]"#
            .to_string();

        let bytes = serialize_for_cache(&page).unwrap();
        let restored: String = deserialize_from_cache(&bytes).unwrap();

        assert_eq!(restored, page);
    }

    #[test]
    fn test_envelope_structure() {
        let bytes = serialize_for_cache(&"[]".to_string()).unwrap();

        // postcard uses variable-length integers, so inspect the decoded envelope
        let envelope: CacheEnvelope<String> = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.payload, "[]");
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let envelope = CacheEnvelope {
            magic: *b"CKIT",
            version: CURRENT_SCHEMA_VERSION,
            payload: "[]".to_string(),
        };
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        let result: Result<String> = deserialize_from_cache(&bytes);
        assert!(matches!(result, Err(Error::InvalidCacheEntry(_))));
    }

    #[test]
    fn test_old_schema_version_rejected() {
        let envelope = CacheEnvelope {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION + 1,
            payload: "[]".to_string(),
        };
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        match deserialize_from_cache::<String>(&bytes) {
            Err(Error::VersionMismatch { expected, found }) => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, CURRENT_SCHEMA_VERSION + 1);
            }
            other => panic!("expected VersionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result: Result<String> = deserialize_from_cache(&[0xff, 0x00]);
        assert!(result.is_err());
    }
}
