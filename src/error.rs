//! Error types for the school API.

use thiserror::Error;

/// Result type for store, cache and serialization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the service internals.
///
/// Everything here is fatal for the request that hits it: the HTTP layer maps
/// these to a 5xx response. Client mistakes (unknown ids, constraint
/// violations, missing roles) are reported through `api::ApiError` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The relational store rejected or failed a query.
    ///
    /// Common causes:
    /// - Connection lost or pool exhausted
    /// - Foreign key constraint violated
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded schema migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Converting a value to JSON or to cache bytes failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Converting cache bytes or a request body back into a value failed.
    ///
    /// **Recovery:** Cache entry should be evicted and recomputed.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// Returned when the magic header is not `b"SCHL"`.
    ///
    /// **Recovery:** Evict the cache entry and recompute.
    #[error("Invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// **Recovery:** Cache entry is evicted and recomputed on next access.
    #[error("Cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Cache backend storage error.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Configuration error during startup.
    ///
    /// **Recovery:** Fix configuration and restart.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Signing or decoding a bearer token failed.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}
