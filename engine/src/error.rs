//! Error types for the Syncline engine.

use crate::{DataType, ItemId};
use thiserror::Error;

/// All possible errors from the Syncline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("Invalid data type: {0}")]
    InvalidDataType(DataType),

    // Data errors
    #[error("type mismatch for item '{id}': expected {expected}, got {got}")]
    TypeMismatch {
        id: ItemId,
        expected: DataType,
        got: DataType,
    },

    #[error("cannot fold a {got} change into a {expected} change list")]
    UnexpectedChange { expected: DataType, got: DataType },

    #[error("invalid change for item '{id}': {reason}")]
    InvalidChange { id: ItemId, reason: String },

    // Protocol errors
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
