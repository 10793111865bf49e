//! Error types for the cache façade.

use std::fmt;

/// Result type for cache and store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache façade.
///
/// Variants fall into three groups:
/// - precondition failures, raised before any remote call
/// - backend failures, propagated unchanged from the store
/// - data-shape failures, raised when stored bytes cannot be interpreted
#[derive(Debug, Clone)]
pub enum Error {
    /// A caller-supplied argument was rejected before touching the store.
    ///
    /// Common causes:
    /// - Empty cache key or index name
    /// - Parallel index name/value lists of different lengths
    /// - Absolute expiration already in the past
    InvalidArgument(String),

    /// Serialization failed when converting an entity or message to bytes.
    SerializationError(String),

    /// Deserialization failed when converting stored bytes to an entity.
    ///
    /// This indicates corrupted or foreign data under an entity key.
    DeserializationError(String),

    /// Entity validation hook rejected a decoded entity.
    ValidationError(String),

    /// The companion expiration record could not be parsed as whole seconds.
    ///
    /// Raised by `refresh`; the primary entry is left untouched.
    InvalidExpiration {
        /// Key of the expiration record
        key: String,
        /// Raw record content (lossy UTF-8)
        value: String,
    },

    /// Backend storage error (Redis connection, protocol, wrong key type).
    ///
    /// No retry is attempted by this crate.
    BackendError(String),

    /// Configuration error during backend or service initialization.
    ///
    /// Common causes:
    /// - Missing configuration section
    /// - Section content of the wrong shape
    /// - Pool creation failure
    ConfigError(String),

    /// Invalid entity envelope: bad magic header.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and stored entity.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from stored entry)
        found: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::InvalidExpiration { key, value } => {
                write!(f, "Invalid expiration record {}: {:?}", key, value)
            }
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Entity version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for Error {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Error::BackendError(format!("Failed to get Redis connection: {}", e))
    }
}
