//! Error types for beacon
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::EntityContext;
use thiserror::Error;

/// Result type alias for beacon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the query layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Context name outside the closed set of entity contexts
    #[error("invalid context: {0:?}")]
    InvalidContext(String),

    /// A collection yielded an object that is not one of the known entity kinds
    #[error("unsupported record type: {0}")]
    UnsupportedRecordType(&'static str),

    /// Read failure reported by the state store
    #[error("state store error: {0}")]
    Store(String),

    /// The caller withdrew interest while the query was running or suspended
    #[error("query cancelled")]
    Cancelled,

    /// Entity not present in its collection
    #[error("{context} entry not found: {id}")]
    NotFound {
        /// Collection that was searched
        context: EntityContext,
        /// Identifier that was not found
        id: String,
    },

    /// Write attempted with an index the store cannot accept
    #[error("invalid index: {0}")]
    InvalidIndex(u64),

    /// Configuration could not be loaded or failed validation
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was caused by the request itself.
    ///
    /// Client errors are returned immediately and must not be retried by the
    /// transport layer.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidContext(_))
    }
}
