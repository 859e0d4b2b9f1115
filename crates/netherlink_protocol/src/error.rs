//! Protocol-level error type.

use thiserror::Error;

/// Failure to turn a raw payload into a typed record.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload was not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload parsed, but its shape does not match the record.
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),
}
