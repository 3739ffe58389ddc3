//! Error types for key-value storage.

use widekv_client::StoreError;

/// Value (de)serialization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(String),
    #[error("failed to decode value: {0}")]
    Decode(String),
    /// The stored `value` attribute is neither binary nor string.
    #[error("unexpected value attribute type {0}")]
    UnexpectedType(&'static str),
}

/// Errors surfaced by key-value storage operations.
///
/// Backend failures during data operations are absorbed by the connection
/// and read as empty results; only codec failures and fatal setup errors
/// reach callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyValueError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
